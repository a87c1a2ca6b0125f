use alloy_primitives::U64;
use jsonrpsee::{
    core::RpcResult,
    http_client::{HttpClient, HttpClientBuilder},
    proc_macros::rpc,
};
use serde::{Deserialize, Serialize};
use statehist_primitives::{ReadWriteLists, B256};

use crate::{errors::ClientResult, ClientError, DEFAULT_RPC_TIMEOUT};

/// Status string the node attaches to transactions rejected before execution
/// for a stale nonce. Such transactions produced no state changes.
const REJECTED_NONCE_STATUS: &str = "incorrect nonce";

/// A block as served by the history endpoint, reduced to what ingestion needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    #[serde(default)]
    pub transactions: Vec<B256>,
}

/// An executed (or rejected) transaction with its recorded state changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInfo {
    #[serde(rename = "statusStr", default)]
    pub status_str: Option<String>,
    #[serde(rename = "rwLists", default)]
    pub rw_lists: Option<ReadWriteLists>,
}

impl TxInfo {
    /// Whether this transaction actually executed and its diffs belong in the
    /// index.
    pub fn was_executed(&self) -> bool {
        self.status_str.as_deref() != Some(REJECTED_NONCE_STATUS)
    }
}

#[rpc(client, namespace = "sbch")]
pub trait ChainHistoryRpc {
    #[method(name = "getBlockByHeight")]
    async fn get_block_by_height(&self, height: U64) -> RpcResult<Option<BlockInfo>>;

    #[method(name = "getTxByHash")]
    async fn get_tx_by_hash(&self, hash: B256) -> RpcResult<Option<TxInfo>>;
}

/// Source of per-block transaction diffs.
#[allow(async_fn_in_trait)]
pub trait ChainHistory {
    async fn block_by_height(&self, height: u64) -> ClientResult<BlockInfo>;

    async fn tx_by_hash(&self, hash: B256) -> ClientResult<TxInfo>;
}

/// [`ChainHistory`] over a node's HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpChainHistory {
    client: HttpClient,
}

impl HttpChainHistory {
    pub fn new(url: &str) -> ClientResult<Self> {
        Self::with_timeout(url, DEFAULT_RPC_TIMEOUT)
    }

    pub fn with_timeout(url: &str, timeout: std::time::Duration) -> ClientResult<Self> {
        let client = HttpClientBuilder::default()
            .request_timeout(timeout)
            .build(url)?;
        Ok(Self { client })
    }
}

impl ChainHistory for HttpChainHistory {
    async fn block_by_height(&self, height: u64) -> ClientResult<BlockInfo> {
        self.client
            .get_block_by_height(U64::from(height))
            .await?
            .ok_or(ClientError::BlockNotFound(height))
    }

    async fn tx_by_hash(&self, hash: B256) -> ClientResult<TxInfo> {
        // a hash taken from a block's own transaction list must resolve
        self.client
            .get_tx_by_hash(hash)
            .await?
            .ok_or_else(|| {
                ClientError::Rpc(jsonrpsee::core::ClientError::Custom(format!(
                    "tx {hash} listed in its block but not resolvable"
                )))
            })
    }
}
