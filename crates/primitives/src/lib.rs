//! Shared value types for the temporal state index.

mod account;
mod diff;
mod record;

pub use account::{
    encode_account_data, encode_bytecode_data, AccountData, BytecodeData, DataError,
    ACCOUNT_DATA_LEN, CODE_HASH_LEN,
};
pub use diff::{
    AccountRead, AccountWrite, BytecodeWrite, CreationCounterWrite, ReadWriteLists, StorageWrite,
};
pub use record::{EntityKey, HistoricalRecord};

// Re-exported so downstream crates agree on one set of EVM value types.
pub use alloy_primitives::{Address, Bytes, B256, U256};
