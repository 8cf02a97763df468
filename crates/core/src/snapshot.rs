//! Point-in-time snapshots of a watched root

use crate::filter::PathFilter;
use std::ffi::OsStr;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;
use walkdir::WalkDir;

/// Type of snapshot entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Regular file (symbolic links are recorded as files)
    File,
    /// Directory
    Directory,
}

/// Metadata recorded for an existing entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Kind of entry
    pub kind: EntryKind,
    /// Last-modified timestamp, if the platform reports one
    pub modified: Option<SystemTime>,
    /// Length in bytes
    pub len: u64,
}

impl Entry {
    /// Create a new file entry
    pub fn file(modified: SystemTime, len: u64) -> Self {
        Self {
            kind: EntryKind::File,
            modified: Some(modified),
            len,
        }
    }

    /// Create a new directory entry
    pub fn directory(modified: SystemTime) -> Self {
        Self {
            kind: EntryKind::Directory,
            modified: Some(modified),
            len: 0,
        }
    }

    fn from_metadata(metadata: &Metadata) -> Self {
        let kind = if metadata.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };

        Self {
            kind,
            modified: metadata.modified().ok(),
            len: if metadata.is_dir() { 0 } else { metadata.len() },
        }
    }
}

/// Immutable recursive view of a file or directory at one instant
///
/// Children are kept sorted by file name and are unique within their parent.
/// A snapshot of a path that did not exist carries no entry and no children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    path: PathBuf,
    entry: Option<Entry>,
    children: Vec<Snapshot>,
}

impl Snapshot {
    /// Walk `root` and record everything accepted by `filter`
    ///
    /// Entries that cannot be read (permission denied, deleted mid-walk) are
    /// left out rather than failing the whole snapshot. The walk is not
    /// atomic: if the tree changes while it runs, the snapshot reflects
    /// whatever each directory listing returned at the time it was read.
    pub fn take(root: &Path, filter: &dyn PathFilter) -> Self {
        let mut stack: Vec<Snapshot> = Vec::new();
        let mut walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|dent| dent.depth() == 0 || filter.accept(dent.path()));

        while let Some(result) = walker.next() {
            let dent = match result {
                Ok(dent) => dent,
                Err(err) => {
                    if stack.is_empty() {
                        debug!(root = %root.display(), "Root not readable: {err}");
                        return Self::absent(root);
                    }
                    debug!("Skipping unreadable entry: {err}");
                    continue;
                }
            };

            let metadata = match dent.metadata() {
                Ok(metadata) => metadata,
                Err(err) => {
                    if dent.depth() == 0 {
                        return Self::absent(root);
                    }
                    debug!(path = %dent.path().display(), "Entry vanished during scan: {err}");
                    if dent.file_type().is_dir() {
                        walker.skip_current_dir();
                    }
                    continue;
                }
            };

            Self::collapse(&mut stack, dent.depth());
            stack.push(Snapshot {
                entry: Some(Entry::from_metadata(&metadata)),
                path: dent.into_path(),
                children: Vec::new(),
            });
        }

        Self::collapse(&mut stack, 1);
        stack.pop().unwrap_or_else(|| Self::absent(root))
    }

    /// Attach every open node deeper than `depth` to its parent
    fn collapse(stack: &mut Vec<Snapshot>, depth: usize) {
        while stack.len() > depth.max(1) {
            if let Some(node) = stack.pop() {
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(node);
                }
            }
        }
    }

    /// Snapshot of a path that does not exist
    pub fn absent(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entry: None,
            children: Vec::new(),
        }
    }

    /// Snapshot of a single existing file
    pub fn file(path: impl Into<PathBuf>, modified: SystemTime, len: u64) -> Self {
        Self {
            path: path.into(),
            entry: Some(Entry::file(modified, len)),
            children: Vec::new(),
        }
    }

    /// Snapshot of an existing directory with the given children
    ///
    /// Children are sorted by file name; later duplicates of a name are dropped.
    pub fn directory(
        path: impl Into<PathBuf>,
        modified: SystemTime,
        mut children: Vec<Snapshot>,
    ) -> Self {
        children.retain(Snapshot::exists);
        children.sort_by(|a, b| a.name().cmp(&b.name()));
        children.dedup_by(|a, b| a.name() == b.name());

        Self {
            path: path.into(),
            entry: Some(Entry::directory(modified)),
            children,
        }
    }

    /// Absolute path of this entry
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name of this entry
    pub fn name(&self) -> Option<&OsStr> {
        self.path.file_name()
    }

    /// Whether the path existed when the snapshot was taken
    pub fn exists(&self) -> bool {
        self.entry.is_some()
    }

    /// Recorded metadata, `None` if the path did not exist
    pub fn entry(&self) -> Option<&Entry> {
        self.entry.as_ref()
    }

    /// Kind of entry, `None` if the path did not exist
    pub fn kind(&self) -> Option<EntryKind> {
        self.entry.as_ref().map(|e| e.kind)
    }

    /// Whether this node exists and is a directory
    pub fn is_dir(&self) -> bool {
        self.kind() == Some(EntryKind::Directory)
    }

    /// Last-modified timestamp
    pub fn modified(&self) -> Option<SystemTime> {
        self.entry.as_ref().and_then(|e| e.modified)
    }

    /// Children in file-name order (empty for files and absent paths)
    pub fn children(&self) -> &[Snapshot] {
        &self.children
    }

    /// Number of existing entries in this subtree, including itself
    pub fn count(&self) -> usize {
        if !self.exists() {
            return 0;
        }
        1 + self.children.iter().map(Snapshot::count).sum::<usize>()
    }

    /// Look up a descendant (or this node) by absolute path
    pub fn find(&self, path: &Path) -> Option<&Snapshot> {
        if self.path == path {
            return Some(self);
        }
        if !path.starts_with(&self.path) {
            return None;
        }
        self.children.iter().find_map(|child| child.find(path))
    }
}
