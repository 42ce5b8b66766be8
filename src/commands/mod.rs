//! Command implementations

pub mod sync;

pub use sync::{run, run_with_logger, SyncSummary};
