//! Snapshot - Metadata map of a directory tree at one point in time

use super::EntryInfo;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Complete metadata map of a tree: relative path → EntryInfo
///
/// Keys are kept sorted, so iteration visits a directory before anything
/// beneath it and repeated runs over the same snapshot are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    entries: BTreeMap<String, EntryInfo>,
}

impl Snapshot {
    /// Create a new empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry keyed by its relative path
    ///
    /// An existing entry for the same path is replaced.
    pub fn insert(&mut self, entry: EntryInfo) {
        self.entries.insert(entry.relative_path.clone(), entry);
    }

    /// Get an entry by relative path
    pub fn get(&self, path: &str) -> Option<&EntryInfo> {
        self.entries.get(path)
    }

    /// Check if a path exists in the snapshot
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterator over (path, entry) pairs in path order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &EntryInfo)> {
        self.entries.iter()
    }

    /// Iterator over just the paths
    pub fn paths(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// Sum of file sizes
    pub fn total_size(&self) -> u64 {
        self.entries.values().map(|e| e.size).sum()
    }

    /// Number of non-directory entries
    pub fn file_count(&self) -> usize {
        self.entries.values().filter(|e| !e.is_dir).count()
    }

    /// Number of directory entries
    pub fn dir_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_dir).count()
    }
}

impl FromIterator<EntryInfo> for Snapshot {
    fn from_iter<I: IntoIterator<Item = EntryInfo>>(iter: I) -> Self {
        let mut snapshot = Snapshot::new();
        for entry in iter {
            snapshot.insert(entry);
        }
        snapshot
    }
}
