use jsonrpsee::core::ClientError as RpcClientError;
use thiserror::Error;

/// Errors surfaced by the RPC collaborators.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The node has no block at the requested height inside the indexed range.
    #[error("block {0} not found")]
    BlockNotFound(u64),

    #[error("rpc: {0}")]
    Rpc(#[from] RpcClientError),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Whether retrying the same call can reasonably succeed. Transport-level
    /// failures and timeouts qualify; a node that answered with an error does
    /// not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Rpc(e) => matches!(
                e,
                RpcClientError::Transport(_)
                    | RpcClientError::RequestTimeout
                    | RpcClientError::RestartNeeded(_)
            ),
            Self::BlockNotFound(_) => false,
        }
    }
}
