use alloy_primitives::U64;
use jsonrpsee::{
    core::{ClientError as RpcClientError, RpcResult},
    http_client::{HttpClient, HttpClientBuilder},
    proc_macros::rpc,
};
use statehist_primitives::{Address, Bytes, B256, U256};

use crate::{errors::ClientResult, DEFAULT_RPC_TIMEOUT};

#[rpc(client, namespace = "eth")]
pub trait EthStateRpc {
    #[method(name = "getTransactionCount")]
    async fn transaction_count(&self, addr: Address, block: U64) -> RpcResult<U64>;

    #[method(name = "getBalance")]
    async fn balance(&self, addr: Address, block: U64) -> RpcResult<U256>;

    #[method(name = "getCode")]
    async fn code(&self, addr: Address, block: U64) -> RpcResult<Bytes>;

    #[method(name = "getStorageAt")]
    async fn storage_at(&self, addr: Address, slot: B256, block: U64) -> RpcResult<B256>;
}

/// Height-parameterized view of the node's live state, the ground truth the
/// checker compares reconstructed records against.
///
/// An entity absent at the queried height reads as zero/empty, matching how
/// a deleted account looks on the wire.
#[allow(async_fn_in_trait)]
pub trait StateOracle {
    async fn nonce_at(&self, addr: Address, height: u64) -> ClientResult<u64>;

    async fn balance_at(&self, addr: Address, height: u64) -> ClientResult<U256>;

    async fn code_at(&self, addr: Address, height: u64) -> ClientResult<Bytes>;

    async fn storage_at(&self, addr: Address, slot: B256, height: u64) -> ClientResult<B256>;
}

/// [`StateOracle`] over the standard `eth` HTTP namespace.
#[derive(Debug, Clone)]
pub struct HttpStateOracle {
    client: HttpClient,
}

impl HttpStateOracle {
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

/// Nodes answer state queries below their pruning horizon, or for entities
/// they never saw, with a call error rather than a zero value. Both read as
/// "absent" here; transport failures still propagate.
fn absent_as_default<T: Default>(res: Result<T, RpcClientError>) -> ClientResult<T> {
    match res {
        Ok(value) => Ok(value),
        Err(RpcClientError::Call(_)) => Ok(T::default()),
        Err(e) => Err(e.into()),
    }
}

impl StateOracle for HttpStateOracle {
    async fn nonce_at(&self, addr: Address, height: u64) -> ClientResult<u64> {
        let nonce =
            absent_as_default(self.client.transaction_count(addr, U64::from(height)).await)?;
        Ok(nonce.to::<u64>())
    }

    async fn balance_at(&self, addr: Address, height: u64) -> ClientResult<U256> {
        absent_as_default(self.client.balance(addr, U64::from(height)).await)
    }

    async fn code_at(&self, addr: Address, height: u64) -> ClientResult<Bytes> {
        absent_as_default(self.client.code(addr, U64::from(height)).await)
    }

    async fn storage_at(&self, addr: Address, slot: B256, height: u64) -> ClientResult<B256> {
        absent_as_default(
            EthStateRpcClient::storage_at(&self.client, addr, slot, U64::from(height)).await,
        )
    }
}
