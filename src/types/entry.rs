//! EntryInfo - Metadata for a single filesystem object in a snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// One filesystem object's metadata at scan time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntryInfo {
    /// Path relative to the sync root, `/`-separated
    pub relative_path: String,

    /// Last modification time (UTC, nanosecond precision)
    pub mtime: DateTime<Utc>,

    /// Size in bytes (0 for directories)
    pub size: u64,

    /// True if this entry is a directory
    pub is_dir: bool,

    /// Hex content fingerprint (empty for directories)
    pub checksum: String,

    /// Unix permissions (mode bits)
    pub permissions: u32,
}

impl EntryInfo {
    /// Create a file entry without a fingerprint
    pub fn file(
        relative_path: impl Into<String>,
        size: u64,
        mtime: impl Into<DateTime<Utc>>,
        permissions: u32,
    ) -> Self {
        Self {
            relative_path: relative_path.into(),
            mtime: mtime.into(),
            size,
            is_dir: false,
            checksum: String::new(),
            permissions,
        }
    }

    /// Create a directory entry
    ///
    /// Directories never carry a size or a fingerprint.
    pub fn directory(
        relative_path: impl Into<String>,
        mtime: impl Into<DateTime<Utc>>,
        permissions: u32,
    ) -> Self {
        Self {
            relative_path: relative_path.into(),
            mtime: mtime.into(),
            size: 0,
            is_dir: true,
            checksum: String::new(),
            permissions,
        }
    }

    /// Attach a content fingerprint
    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = checksum.into();
        self
    }

    /// Check if this entry has a computed fingerprint
    pub fn has_checksum(&self) -> bool {
        !self.checksum.is_empty()
    }

    /// Modification time as a `SystemTime`
    pub fn modified(&self) -> SystemTime {
        SystemTime::from(self.mtime)
    }
}
