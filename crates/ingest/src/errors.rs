use statehist_client::ClientError;
use statehist_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("chain history: {0}")]
    History(#[from] ClientError),

    #[error("store: {0}")]
    Store(#[from] StoreError),

    /// Ingestion was cancelled before reaching `end_height`; everything below
    /// the named height is committed.
    #[error("ingestion cancelled before height {0}")]
    Cancelled(u64),
}
