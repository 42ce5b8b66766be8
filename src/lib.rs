//! # replik - One-way directory synchronizer
//!
//! Mirrors a source tree into a destination tree. New and changed files are
//! copied, files removed from the source are deleted, and a record of the
//! last sync kept in the destination means later runs only touch what
//! changed.

// Module declarations
pub mod commands;
pub mod config;
pub mod diff;
pub mod executor;
pub mod hash;
pub mod logging;
pub mod report;
pub mod retry;
pub mod scanner;
pub mod state;
pub mod types;
pub mod ui;

// Re-export commonly used types
pub use config::Config;
pub use logging::{Logger, MemoryLogger, NoopLogger, TracingLogger};
pub use types::{ActionKind, EntryInfo, Snapshot, SyncAction, SyncError, SyncState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
