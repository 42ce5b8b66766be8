//! SyncState - The persisted record of the last successful sync

use super::Snapshot;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// The only state file schema this build reads and writes
pub const STATE_VERSION: u32 = 1;

/// Persisted sync record stored in the destination root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    /// Schema version of the state file
    pub version: u32,

    /// When the previous sync completed (epoch milliseconds)
    pub last_sync: i64,

    /// Snapshot that was true as of that sync
    pub entries: Snapshot,
}

impl SyncState {
    /// Fresh state for a destination that has never been synced
    pub fn new() -> Self {
        Self {
            version: STATE_VERSION,
            last_sync: Utc::now().timestamp_millis(),
            entries: Snapshot::new(),
        }
    }

    /// Stamp with the current time
    pub fn touch(&mut self) {
        self.last_sync = Utc::now().timestamp_millis();
    }

    /// Replace the recorded entries wholesale
    pub fn replace_entries(&mut self, entries: Snapshot) {
        self.entries = entries;
    }
}

impl Default for SyncState {
    fn default() -> Self {
        Self::new()
    }
}
