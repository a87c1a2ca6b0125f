//! Drives per-block transaction diffs from the chain-history endpoint into
//! the versioned store.

mod driver;
mod errors;

pub use driver::{IngestDriver, IngestSummary};
pub use errors::IngestError;
