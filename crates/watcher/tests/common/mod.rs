//! Shared helpers for watcher integration tests

#![allow(dead_code)]

use filetime::{set_file_mtime, FileTime};
use fsmon_watcher::Listener;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant, SystemTime};

/// Listener recording every event as `(tag, path)`
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<(&'static str, PathBuf)>>,
}

impl Recorder {
    /// Drain recorded events
    pub fn take(&self) -> Vec<(&'static str, PathBuf)> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    fn push(&self, tag: &'static str, path: &Path) -> anyhow::Result<()> {
        self.events.lock().push((tag, path.to_path_buf()));
        Ok(())
    }
}

impl Listener for Recorder {
    fn on_directory_create(&self, path: &Path) -> anyhow::Result<()> {
        self.push("dir-create", path)
    }

    fn on_directory_delete(&self, path: &Path) -> anyhow::Result<()> {
        self.push("dir-delete", path)
    }

    fn on_file_create(&self, path: &Path) -> anyhow::Result<()> {
        self.push("file-create", path)
    }

    fn on_file_change(&self, path: &Path) -> anyhow::Result<()> {
        self.push("file-change", path)
    }

    fn on_file_delete(&self, path: &Path) -> anyhow::Result<()> {
        self.push("file-delete", path)
    }
}

/// Move a file's mtime forward so the change is visible regardless of
/// timestamp granularity
pub fn bump_mtime(path: &Path, secs: u64) {
    let later = SystemTime::now() + Duration::from_secs(secs);
    set_file_mtime(path, FileTime::from_system_time(later)).unwrap();
}

/// Poll `condition` until it holds or `timeout` elapses
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}
