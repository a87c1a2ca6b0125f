use alloy_primitives::{Address, B256};

/// Identifies which versioned facet of an address a record describes.
///
/// Accounts, bytecode, and storage slots version independently even when they
/// share an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKey {
    Account,
    Bytecode,
    Storage(B256),
}

impl EntityKey {
    /// The slot bytes, for storage keys.
    pub fn slot(&self) -> Option<&B256> {
        match self {
            Self::Storage(slot) => Some(slot),
            _ => None,
        }
    }
}

/// One reconstructed validity interval: the entity held `value` over
/// `[start_height, end_height)`.
///
/// An empty `value` means the entity was deleted or absent for the interval.
/// For a fixed `(addr, key)` the records partition the indexed range from the
/// entity's first write onward, contiguously and without overlap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoricalRecord {
    pub addr: Address,
    pub key: EntityKey,
    pub value: Vec<u8>,
    /// Height at which this value became effective (inclusive).
    pub start_height: u64,
    /// Height at which this value stopped being effective (exclusive).
    pub end_height: u64,
}

impl HistoricalRecord {
    /// Whether the interval covers no height at all.
    ///
    /// A write superseded within its own block would produce this; it does
    /// not occur under correct ingestion but consumers tolerate and drop it
    /// rather than querying.
    pub fn is_zero_width(&self) -> bool {
        self.start_height >= self.end_height
    }

    /// Whether this interval represents a deleted/absent entity.
    pub fn is_deletion(&self) -> bool {
        self.value.is_empty()
    }
}
