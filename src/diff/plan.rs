//! Sync plan generation

use super::compare::{compare_states_with, CompareMode};
use crate::types::{ActionKind, Snapshot, SyncAction};

/// Diff plan containing actions and statistics
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiffPlan {
    /// Actions in execution order
    pub actions: Vec<SyncAction>,

    /// Aggregate statistics about the plan
    pub stats: PlanStats,
}

impl DiffPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an action to the plan and update statistics
    pub fn add_action(&mut self, action: SyncAction) {
        self.stats.record(&action);
        self.actions.push(action);
    }

    /// True when nothing needs to be created, updated or deleted
    pub fn is_noop(&self) -> bool {
        self.stats.change_count() == 0
    }

    /// Actions other than `Skip`
    pub fn changes(&self) -> impl Iterator<Item = &SyncAction> {
        self.actions.iter().filter(|a| !a.is_skip())
    }
}

impl FromIterator<SyncAction> for DiffPlan {
    fn from_iter<I: IntoIterator<Item = SyncAction>>(iter: I) -> Self {
        let mut plan = DiffPlan::new();
        for action in iter {
            plan.add_action(action);
        }
        plan
    }
}

/// Statistics about a diff plan
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlanStats {
    /// Bytes that will be copied (Create + Update of files)
    pub total_bytes: u64,

    pub create_count: usize,
    pub update_count: usize,
    pub delete_count: usize,
    pub skip_count: usize,
}

impl PlanStats {
    fn record(&mut self, action: &SyncAction) {
        match action.kind() {
            ActionKind::Create => self.create_count += 1,
            ActionKind::Update => self.update_count += 1,
            ActionKind::Delete => self.delete_count += 1,
            ActionKind::Skip => self.skip_count += 1,
        }
        if let Some(entry) = action.source() {
            if !entry.is_dir {
                self.total_bytes += entry.size;
            }
        }
    }

    /// Number of actions that touch the destination
    pub fn change_count(&self) -> usize {
        self.create_count + self.update_count + self.delete_count
    }

    pub fn total_actions(&self) -> usize {
        self.change_count() + self.skip_count
    }
}

/// Build a [`DiffPlan`] from a fresh scan and the last recorded snapshot
///
/// # Example
/// ```
/// use replik::diff::{generate_sync_plan, CompareMode};
/// use replik::types::{EntryInfo, Snapshot};
/// use std::time::{Duration, UNIX_EPOCH};
///
/// let mut current = Snapshot::new();
/// current.insert(EntryInfo::file(
///     "new.txt",
///     4,
///     UNIX_EPOCH + Duration::from_secs(1_000),
///     0o644,
/// ));
///
/// let plan = generate_sync_plan(&current, &Snapshot::new(), CompareMode::Metadata);
/// assert_eq!(plan.stats.create_count, 1);
/// assert_eq!(plan.stats.total_bytes, 4);
/// ```
pub fn generate_sync_plan(current: &Snapshot, previous: &Snapshot, mode: CompareMode) -> DiffPlan {
    compare_states_with(current, previous, mode)
        .into_iter()
        .collect()
}
