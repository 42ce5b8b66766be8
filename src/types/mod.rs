//! Core type definitions for replik

mod action;
mod entry;
mod error;
mod snapshot;
mod state;

pub use action::{ActionKind, SyncAction};
pub use entry::EntryInfo;
pub use error::SyncError;
pub use snapshot::Snapshot;
pub use state::{SyncState, STATE_VERSION};
