//! Inclusion predicates applied while snapshotting

use std::path::Path;

/// Decides whether a path below a watched root is part of its snapshot.
///
/// A rejected path is left out of the tree entirely: it is never reported
/// and, if it is a directory, never descended into. The watched root
/// itself is always included.
pub trait PathFilter: Send + Sync {
    /// Return true to include `path` in the snapshot
    fn accept(&self, path: &Path) -> bool;
}

impl<F> PathFilter for F
where
    F: Fn(&Path) -> bool + Send + Sync,
{
    fn accept(&self, path: &Path) -> bool {
        self(path)
    }
}

/// Filter that includes every path
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl PathFilter for AcceptAll {
    fn accept(&self, _path: &Path) -> bool {
        true
    }
}
