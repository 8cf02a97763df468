//! Observer: one watched root, its latest snapshot and its listeners

use crate::error::{panic_message, WatchError};
use crate::listener::{dispatch, Listener};
use fsmon_core::{diff, AcceptAll, Change, ChangeKind, PathFilter, Snapshot};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Outcome of one `check_and_notify` call
#[derive(Debug, Default)]
pub struct CycleReport {
    /// Changes detected, in dispatch order
    pub changes: Vec<Change>,
    /// Listener failures contained during dispatch
    pub errors: Vec<WatchError>,
}

impl CycleReport {
    /// Whether no listener failed during the cycle
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Watches a single root by diffing successive snapshots
///
/// Only the latest snapshot is retained. Listeners are notified in
/// registration order.
pub struct Observer {
    root: PathBuf,
    filter: Arc<dyn PathFilter>,
    snapshot: Option<Snapshot>,
    listeners: Vec<Arc<dyn Listener>>,
}

impl Observer {
    /// Observe everything below `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_filter(root, AcceptAll)
    }

    /// Observe only the paths below `root` accepted by `filter`
    pub fn with_filter(root: impl Into<PathBuf>, filter: impl PathFilter + 'static) -> Self {
        Self::with_shared_filter(root, Arc::new(filter))
    }

    /// Like `with_filter`, reusing a filter shared with other observers
    pub fn with_shared_filter(root: impl Into<PathBuf>, filter: Arc<dyn PathFilter>) -> Self {
        Self {
            root: root.into(),
            filter,
            snapshot: None,
            listeners: Vec::new(),
        }
    }

    /// Watched root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Latest snapshot, `None` before `initialize`
    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    /// Whether a baseline snapshot has been taken
    pub fn is_initialized(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Register a listener; it is notified after those already registered
    pub fn add_listener(&mut self, listener: Arc<dyn Listener>) {
        self.listeners.push(listener);
    }

    /// Unregister a listener by identity. Returns whether it was registered.
    pub fn remove_listener(&mut self, listener: &Arc<dyn Listener>) -> bool {
        let target = Arc::as_ptr(listener) as *const ();
        let before = self.listeners.len();
        self.listeners
            .retain(|l| Arc::as_ptr(l) as *const () != target);
        self.listeners.len() != before
    }

    /// Registered listeners, in registration order
    pub fn listeners(&self) -> &[Arc<dyn Listener>] {
        &self.listeners
    }

    /// Take the baseline snapshot without notifying anyone
    pub fn initialize(&mut self) {
        let snapshot = Snapshot::take(&self.root, self.filter.as_ref());
        debug!(
            root = %self.root.display(),
            exists = snapshot.exists(),
            entries = snapshot.count(),
            "Baseline snapshot taken"
        );
        self.snapshot = Some(snapshot);
    }

    /// Rescan the root, notify listeners of every change, keep the new snapshot
    ///
    /// On an observer that was never initialized this only takes the
    /// baseline. Listener errors and panics are collected in the report and
    /// do not stop dispatch; the new snapshot replaces the old one either way.
    pub fn check_and_notify(&mut self) -> CycleReport {
        let Some(previous) = self.snapshot.take() else {
            self.initialize();
            return CycleReport::default();
        };

        let current = Snapshot::take(&self.root, self.filter.as_ref());
        let changes = diff(&previous, &current);
        let mut errors = Vec::new();

        for listener in &self.listeners {
            invoke(&mut errors, None, &self.root, || listener.on_start(&self.root));
        }

        for change in &changes {
            for listener in &self.listeners {
                invoke(&mut errors, Some(change.kind), &change.path, || {
                    dispatch(listener.as_ref(), change)
                });
            }
        }

        for listener in &self.listeners {
            invoke(&mut errors, None, &self.root, || listener.on_stop(&self.root));
        }

        debug!(
            root = %self.root.display(),
            changes = changes.len(),
            errors = errors.len(),
            "Scan complete"
        );

        self.snapshot = Some(current);
        CycleReport { changes, errors }
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("root", &self.root)
            .field("initialized", &self.is_initialized())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Run one listener callback, turning errors and panics into `WatchError`s
fn invoke<F>(errors: &mut Vec<WatchError>, kind: Option<ChangeKind>, path: &Path, callback: F)
where
    F: FnOnce() -> anyhow::Result<()>,
{
    match panic::catch_unwind(AssertUnwindSafe(callback)) {
        Ok(Ok(())) => {}
        Ok(Err(source)) => errors.push(WatchError::Listener {
            kind,
            path: path.to_path_buf(),
            source,
        }),
        Err(payload) => errors.push(WatchError::ListenerPanic {
            path: path.to_path_buf(),
            message: panic_message(payload.as_ref()),
        }),
    }
}
