//! Listener capability notified of detected changes
//!
//! Every callback has a no-op default, so a listener only overrides the
//! events it cares about. Listeners are shared as `Arc<dyn Listener>` and
//! may be registered on many observers, possibly driven by different
//! monitors, so implementations must tolerate concurrent calls.

use anyhow::Result;
use fsmon_core::{Change, ChangeKind, EntryKind};
use std::path::Path;

/// Consumer of create / modify / delete events
#[allow(unused_variables)]
pub trait Listener: Send + Sync {
    /// Called before an observer compares snapshots
    fn on_start(&self, root: &Path) -> Result<()> {
        Ok(())
    }

    /// Directory created
    fn on_directory_create(&self, path: &Path) -> Result<()> {
        Ok(())
    }

    /// Directory deleted
    fn on_directory_delete(&self, path: &Path) -> Result<()> {
        Ok(())
    }

    /// File created
    fn on_file_create(&self, path: &Path) -> Result<()> {
        Ok(())
    }

    /// File contents or timestamp changed
    fn on_file_change(&self, path: &Path) -> Result<()> {
        Ok(())
    }

    /// File deleted
    fn on_file_delete(&self, path: &Path) -> Result<()> {
        Ok(())
    }

    /// Called after all changes of the cycle were dispatched
    fn on_stop(&self, root: &Path) -> Result<()> {
        Ok(())
    }
}

/// Route a change to the matching callback
pub(crate) fn dispatch(listener: &dyn Listener, change: &Change) -> Result<()> {
    let path = change.path.as_path();
    match (change.kind, change.entry) {
        (ChangeKind::Create, EntryKind::Directory) => listener.on_directory_create(path),
        (ChangeKind::Delete, EntryKind::Directory) => listener.on_directory_delete(path),
        (ChangeKind::Create, EntryKind::File) => listener.on_file_create(path),
        (ChangeKind::Modify, _) => listener.on_file_change(path),
        (ChangeKind::Delete, EntryKind::File) => listener.on_file_delete(path),
    }
}
