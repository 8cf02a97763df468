//! Snapshot diffing
//!
//! Compares two snapshots of the same root and produces the changes that
//! turn the old tree into the new one. The returned list is ordered in four
//! phases, keeping lexicographic traversal order inside each phase:
//!
//! 1. deletions, children before their parent
//! 2. directory creations, parent before its children
//! 3. file modifications
//! 4. file creations

use crate::snapshot::{EntryKind, Snapshot};
use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;

/// Type of change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// Entry created
    Create,
    /// File contents or timestamp changed
    Modify,
    /// Entry deleted
    Delete,
}

impl ChangeKind {
    /// Single-letter code used in line output (`C`, `M`, `D`)
    pub fn code(self) -> char {
        match self {
            ChangeKind::Create => 'C',
            ChangeKind::Modify => 'M',
            ChangeKind::Delete => 'D',
        }
    }
}

/// A single detected change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// Type of change
    pub kind: ChangeKind,
    /// Whether the affected entry is a file or a directory
    pub entry: EntryKind,
    /// Absolute path of the affected entry
    pub path: PathBuf,
}

impl Change {
    pub fn new(kind: ChangeKind, entry: EntryKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            entry,
            path: path.into(),
        }
    }

    fn phase(&self) -> u8 {
        match (self.kind, self.entry) {
            (ChangeKind::Delete, _) => 0,
            (ChangeKind::Create, EntryKind::Directory) => 1,
            (ChangeKind::Modify, _) => 2,
            (ChangeKind::Create, EntryKind::File) => 3,
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.code(), self.path.display())
    }
}

/// Compute the ordered changes between two snapshots of the same root
pub fn diff(old: &Snapshot, new: &Snapshot) -> Vec<Change> {
    let mut changes = Vec::new();
    compare(old, new, &mut changes);
    // Stable: traversal order survives within each phase.
    changes.sort_by_key(Change::phase);
    changes
}

fn compare(old: &Snapshot, new: &Snapshot, out: &mut Vec<Change>) {
    match (old.entry(), new.entry()) {
        (None, None) => {}
        (None, Some(_)) => created(new, out),
        (Some(_), None) => deleted(old, out),
        (Some(before), Some(after)) if before.kind != after.kind => {
            deleted(old, out);
            created(new, out);
        }
        (Some(before), Some(after)) => match after.kind {
            EntryKind::File => {
                if before.modified != after.modified || before.len != after.len {
                    out.push(Change::new(ChangeKind::Modify, EntryKind::File, new.path()));
                }
            }
            EntryKind::Directory => compare_children(old.children(), new.children(), out),
        },
    }
}

/// Pair children by name; both slices are sorted by file name
fn compare_children(old: &[Snapshot], new: &[Snapshot], out: &mut Vec<Change>) {
    let (mut i, mut j) = (0, 0);

    while i < old.len() && j < new.len() {
        match old[i].name().cmp(&new[j].name()) {
            Ordering::Less => {
                deleted(&old[i], out);
                i += 1;
            }
            Ordering::Greater => {
                created(&new[j], out);
                j += 1;
            }
            Ordering::Equal => {
                compare(&old[i], &new[j], out);
                i += 1;
                j += 1;
            }
        }
    }

    old[i..].iter().for_each(|child| deleted(child, out));
    new[j..].iter().for_each(|child| created(child, out));
}

fn created(node: &Snapshot, out: &mut Vec<Change>) {
    if let Some(kind) = node.kind() {
        out.push(Change::new(ChangeKind::Create, kind, node.path()));
        for child in node.children() {
            created(child, out);
        }
    }
}

fn deleted(node: &Snapshot, out: &mut Vec<Change>) {
    if let Some(kind) = node.kind() {
        for child in node.children() {
            deleted(child, out);
        }
        out.push(Change::new(ChangeKind::Delete, kind, node.path()));
    }
}
