use statehist_primitives::Address;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from the versioned store.
///
/// The `Malformed*` and `UnresolvedSequence` variants mean the upstream diff
/// stream violated its format contract; ingestion must abort on them rather
/// than commit a corrupt batch.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("account blob for {0} has invalid length {1}")]
    MalformedAccount(Address, usize),

    #[error("bytecode blob for {0} has invalid length {1}")]
    MalformedBytecode(Address, usize),

    #[error("storage write references unresolved sequence {0}")]
    UnresolvedSequence(u64),

    #[error("invalid key tag byte {0}")]
    InvalidTag(u8),

    #[error("key under tag {tag} is truncated at {len} bytes")]
    TruncatedKey { tag: u8, len: usize },

    #[error("deletion marker for {0} has invalid length {1}")]
    MalformedDeletionMarker(Address, usize),

    #[error("rocksdb: {0}")]
    Backend(#[from] rocksdb::Error),
}
