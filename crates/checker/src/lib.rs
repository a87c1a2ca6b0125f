//! Cross-checks reconstructed history against a live node.
//!
//! A blocking producer scans the store and feeds records over a bounded
//! channel to an async consumer that samples heights inside each validity
//! interval and queries the node's state at those heights.

mod checker;
mod errors;

pub use checker::{run_checks, CheckSummary, CheckerConfig};
pub use errors::CheckError;
