//! Dry-run report
//!
//! The flat action list is folded into a path tree stored as an arena:
//! nodes live in one `Vec` and refer to their parent and children by index.
//! Node 0 is the destination root.

use crate::types::{ActionKind, Snapshot, SyncAction};
use indicatif::HumanBytes;
use std::collections::BTreeMap;
use std::fmt::Write as _;

const ROOT: usize = 0;

/// One path segment in the report tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportNode {
    pub name: String,
    /// Action for this exact path; `None` for intermediate directories
    pub kind: Option<ActionKind>,
    pub size: u64,
    pub is_dir: bool,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

/// Arena-backed tree of planned changes
#[derive(Debug, Clone)]
pub struct ReportTree {
    nodes: Vec<ReportNode>,
}

impl ReportTree {
    /// Build the tree from `actions`
    ///
    /// Skips are left out. Deletes carry no metadata, so their size and
    /// directory flag come from `previous`.
    pub fn build(actions: &[SyncAction], previous: &Snapshot) -> Self {
        let mut tree = Self {
            nodes: vec![ReportNode {
                name: ".".to_string(),
                kind: None,
                size: 0,
                is_dir: true,
                parent: None,
                children: Vec::new(),
            }],
        };

        for action in actions.iter().filter(|a| !a.is_skip()) {
            let (size, is_dir) = match action.source() {
                Some(entry) => (entry.size, entry.is_dir),
                None => previous
                    .get(action.path())
                    .map(|e| (e.size, e.is_dir))
                    .unwrap_or((0, false)),
            };

            let mut current = ROOT;
            for segment in action.path().split('/').filter(|s| !s.is_empty()) {
                current = tree.child(current, segment);
            }
            if current == ROOT {
                continue;
            }

            let node = &mut tree.nodes[current];
            node.kind = Some(action.kind());
            node.size = size;
            node.is_dir = is_dir;
        }

        tree
    }

    fn child(&mut self, parent: usize, name: &str) -> usize {
        if let Some(&existing) = self.nodes[parent]
            .children
            .iter()
            .find(|&&idx| self.nodes[idx].name == name)
        {
            return existing;
        }

        let idx = self.nodes.len();
        self.nodes.push(ReportNode {
            name: name.to_string(),
            kind: None,
            size: 0,
            is_dir: true,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(idx);
        idx
    }

    pub fn root(&self) -> &ReportNode {
        &self.nodes[ROOT]
    }

    pub fn node(&self, idx: usize) -> Option<&ReportNode> {
        self.nodes.get(idx)
    }

    /// Number of nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[ROOT].children.is_empty()
    }

    /// Full `/`-joined path of a node
    pub fn path_of(&self, idx: usize) -> String {
        let mut parts = Vec::new();
        let mut current = Some(idx);
        while let Some(i) = current {
            if i == ROOT {
                break;
            }
            parts.push(self.nodes[i].name.as_str());
            current = self.nodes[i].parent;
        }
        parts.reverse();
        parts.join("/")
    }

    /// Render as an indented tree with box-drawing connectors
    pub fn render(&self) -> String {
        let mut out = String::from(".\n");
        self.render_children(ROOT, "", &mut out);
        out
    }

    fn render_children(&self, idx: usize, prefix: &str, out: &mut String) {
        let mut children = self.nodes[idx].children.clone();
        children.sort_by(|a, b| self.nodes[*a].name.cmp(&self.nodes[*b].name));

        let count = children.len();
        for (pos, child) in children.into_iter().enumerate() {
            let last = pos + 1 == count;
            let node = &self.nodes[child];
            let connector = if last { "└── " } else { "├── " };

            let mut line = String::new();
            if let Some(kind) = node.kind {
                let _ = write!(line, "[{}] ", kind);
            }
            line.push_str(&node.name);
            if node.is_dir {
                line.push('/');
            } else if node.kind.is_some() {
                let _ = write!(line, " ({})", HumanBytes(node.size));
            }

            let _ = writeln!(out, "{}{}{}", prefix, connector, line);

            let child_prefix = format!("{}{}", prefix, if last { "    " } else { "│   " });
            self.render_children(child, &child_prefix, out);
        }
    }
}

/// Counts and sizes for one action kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindTotals {
    pub files: usize,
    pub dirs: usize,
    pub bytes: u64,
}

/// Aggregate counts by action kind, split into files and directories
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSummary {
    totals: BTreeMap<ActionKind, KindTotals>,
}

impl ReportSummary {
    pub fn build(actions: &[SyncAction], previous: &Snapshot) -> Self {
        let mut totals: BTreeMap<ActionKind, KindTotals> = BTreeMap::new();

        for action in actions {
            let (size, is_dir) = match action {
                SyncAction::Create(entry) | SyncAction::Update(entry) => (entry.size, entry.is_dir),
                SyncAction::Delete(path) | SyncAction::Skip(path) => previous
                    .get(path)
                    .map(|e| (e.size, e.is_dir))
                    .unwrap_or((0, false)),
            };

            let slot = totals.entry(action.kind()).or_default();
            if is_dir {
                slot.dirs += 1;
            } else {
                slot.files += 1;
                slot.bytes += size;
            }
        }

        Self { totals }
    }

    pub fn get(&self, kind: ActionKind) -> KindTotals {
        self.totals.get(&kind).copied().unwrap_or_default()
    }

    pub fn render(&self) -> String {
        let mut lines = vec!["Summary:".to_string()];
        for kind in [
            ActionKind::Create,
            ActionKind::Update,
            ActionKind::Delete,
            ActionKind::Skip,
        ] {
            let totals = self.get(kind);
            lines.push(format!(
                "  {:<7} {} file(s), {} dir(s), {}",
                kind.label(),
                totals.files,
                totals.dirs,
                HumanBytes(totals.bytes)
            ));
        }
        lines.join("\n")
    }
}

/// Full dry-run report: change tree followed by the summary
pub fn render_report(actions: &[SyncAction], previous: &Snapshot) -> String {
    let tree = ReportTree::build(actions, previous);
    let summary = ReportSummary::build(actions, previous);

    let mut out = String::from("Dry-run report:\n");
    if tree.is_empty() {
        out.push_str("  (no changes)\n");
    } else {
        out.push_str(&tree.render());
    }
    out.push_str(&summary.render());
    out
}
