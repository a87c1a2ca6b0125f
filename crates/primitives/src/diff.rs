use alloy_primitives::{Address, Bytes, B256};
use serde::{Deserialize, Serialize};

/// The state changes produced by executing one transaction, as served by the
/// chain-history endpoint.
///
/// List order is execution order and must be preserved by consumers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadWriteLists {
    #[serde(rename = "accountRList", default)]
    pub account_rlist: Vec<AccountRead>,
    #[serde(rename = "accountWList", default)]
    pub account_wlist: Vec<AccountWrite>,
    #[serde(rename = "bytecodeWList", default)]
    pub bytecode_wlist: Vec<BytecodeWrite>,
    #[serde(rename = "creationCounterWList", default)]
    pub creation_counter_wlist: Vec<CreationCounterWrite>,
    #[serde(rename = "storageWList", default)]
    pub storage_wlist: Vec<StorageWrite>,
}

impl ReadWriteLists {
    /// Whether the diff contains no writes at all (reads alone change
    /// nothing).
    pub fn is_empty(&self) -> bool {
        self.account_wlist.is_empty()
            && self.bytecode_wlist.is_empty()
            && self.creation_counter_wlist.is_empty()
            && self.storage_wlist.is_empty()
    }
}

/// An account read, carrying the sequence number storage writes refer to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRead {
    pub seq: u64,
    pub addr: Address,
    pub account: Bytes,
}

/// An account write. Empty `account` bytes delete the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountWrite {
    pub addr: Address,
    pub account: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BytecodeWrite {
    pub addr: Address,
    pub bytecode: Bytes,
}

/// A storage write, addressed by account sequence rather than address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageWrite {
    pub seq: u64,
    pub key: B256,
    pub value: Bytes,
}

/// A write to the per-`lsb` contract-creation counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreationCounterWrite {
    pub lsb: u8,
    pub counter: u64,
}
