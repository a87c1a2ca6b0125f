//! RocksDB-backed height-versioned state index.
//!
//! Every write is keyed by `(entity, height)` with big-endian heights, so the
//! store is append-only and one forward range scan reconstructs the full
//! validity-interval history of every entity ever touched.

mod errors;
mod keys;
mod resolver;
mod store;

pub use errors::{StoreError, StoreResult};
pub use keys::{decode_record, encode_version_key, ACCOUNT_TAG, BYTECODE_TAG, STORAGE_TAG};
pub use resolver::SeqResolver;
pub use store::{BlockWriter, HistoryStore, RecordIter};
