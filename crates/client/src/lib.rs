//! RPC collaborators: the chain-history source that feeds ingestion and the
//! live state oracle the checker verifies reconstructed records against.

use std::time::Duration;

mod errors;
mod history;
mod oracle;

pub use errors::{ClientError, ClientResult};
pub use history::{BlockInfo, ChainHistory, ChainHistoryRpcClient, HttpChainHistory, TxInfo};
pub use oracle::{EthStateRpcClient, HttpStateOracle, StateOracle};

/// Default per-request timeout for both HTTP clients.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(15);
