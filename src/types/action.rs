//! SyncAction - Actions determined by the differencer

use super::EntryInfo;
use std::fmt;

/// One unit of work needed to reconcile the destination with the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// Entry unchanged since the last sync
    Skip(String),

    /// Entry exists in the source but not in the last state
    Create(EntryInfo),

    /// Entry exists on both sides but changed
    Update(EntryInfo),

    /// Entry was removed from the source
    Delete(String),
}

/// Action kind without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionKind {
    Skip,
    Create,
    Update,
    Delete,
}

impl SyncAction {
    /// Relative path the action applies to
    pub fn path(&self) -> &str {
        match self {
            SyncAction::Skip(path) | SyncAction::Delete(path) => path,
            SyncAction::Create(entry) | SyncAction::Update(entry) => &entry.relative_path,
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            SyncAction::Skip(_) => ActionKind::Skip,
            SyncAction::Create(_) => ActionKind::Create,
            SyncAction::Update(_) => ActionKind::Update,
            SyncAction::Delete(_) => ActionKind::Delete,
        }
    }

    /// Source-side metadata (create/update only)
    pub fn source(&self) -> Option<&EntryInfo> {
        match self {
            SyncAction::Create(entry) | SyncAction::Update(entry) => Some(entry),
            SyncAction::Skip(_) | SyncAction::Delete(_) => None,
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, SyncAction::Skip(_))
    }

    pub fn is_create(&self) -> bool {
        matches!(self, SyncAction::Create(_))
    }

    pub fn is_update(&self) -> bool {
        matches!(self, SyncAction::Update(_))
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, SyncAction::Delete(_))
    }
}

impl ActionKind {
    /// Upper-case label used in reports and logs
    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::Skip => "NONE",
            ActionKind::Create => "CREATE",
            ActionKind::Update => "UPDATE",
            ActionKind::Delete => "DELETE",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
