use statehist_client::ClientError;
use statehist_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("store: {0}")]
    Store(#[from] StoreError),

    /// The oracle stayed unreachable through the bounded retries. Mismatching
    /// answers are counted in the summary instead; only unavailability is an
    /// error.
    #[error("oracle unavailable: {0}")]
    Oracle(#[source] ClientError),

    #[error("record scanner failed: {0}")]
    Scanner(#[from] tokio::task::JoinError),

    #[error("check cancelled")]
    Cancelled,
}
