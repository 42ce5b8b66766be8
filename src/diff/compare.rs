//! Snapshot comparison

use crate::types::{EntryInfo, Snapshot, SyncAction};
use chrono::Duration;

/// Timestamps closer than this are considered equal
pub const MTIME_TOLERANCE_MS: i64 = 1000;

/// How an entry present on both sides is judged unchanged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompareMode {
    /// Same size and modification times within [`MTIME_TOLERANCE_MS`]
    #[default]
    Metadata,
    /// Same size and same fingerprint, regardless of timestamps
    ///
    /// Falls back to [`CompareMode::Metadata`] when either side lacks a
    /// fingerprint.
    Checksum,
}

/// Check whether `current` still matches the recorded `previous` entry
pub fn is_unchanged(current: &EntryInfo, previous: &EntryInfo, mode: CompareMode) -> bool {
    if current.size != previous.size {
        return false;
    }

    if mode == CompareMode::Checksum && current.has_checksum() && previous.has_checksum() {
        return current.checksum == previous.checksum;
    }

    mtime_within_tolerance(current, previous)
}

fn mtime_within_tolerance(a: &EntryInfo, b: &EntryInfo) -> bool {
    let tolerance = Duration::milliseconds(MTIME_TOLERANCE_MS);
    let delta = a.mtime.signed_duration_since(b.mtime);
    delta < tolerance && delta > -tolerance
}

/// Compare a fresh scan against the last recorded snapshot
///
/// Produces exactly one action per path in the union of both snapshots:
///
/// 1. Only in `current` → `Create`
/// 2. In both and unchanged → `Skip`
/// 3. In both and changed → `Update`
/// 4. Only in `previous` → `Delete`
///
/// Creates, updates and skips come first in path order, then deletes in
/// path order. The function is pure; equal inputs give equal output.
pub fn compare_states(current: &Snapshot, previous: &Snapshot) -> Vec<SyncAction> {
    compare_states_with(current, previous, CompareMode::Metadata)
}

/// [`compare_states`] with an explicit [`CompareMode`]
pub fn compare_states_with(
    current: &Snapshot,
    previous: &Snapshot,
    mode: CompareMode,
) -> Vec<SyncAction> {
    let mut actions = Vec::with_capacity(current.len());

    for (path, entry) in current.iter() {
        let action = match previous.get(path) {
            None => SyncAction::Create(entry.clone()),
            Some(recorded) if is_unchanged(entry, recorded, mode) => SyncAction::Skip(path.clone()),
            Some(_) => SyncAction::Update(entry.clone()),
        };
        actions.push(action);
    }

    actions.extend(
        previous
            .paths()
            .filter(|path| !current.contains(path))
            .map(|path| SyncAction::Delete(path.clone())),
    );

    actions
}
