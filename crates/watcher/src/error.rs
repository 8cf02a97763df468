//! Error types for observers and monitors

use fsmon_core::ChangeKind;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for watcher operations
pub type Result<T> = std::result::Result<T, WatchError>;

/// Errors raised while scheduling or running scan cycles
///
/// Errors that happen inside a cycle (`Listener`, `ListenerPanic`,
/// `ObserverPanic`) are contained at the observer: they are logged and
/// published on the monitor's error channel, never propagated.
#[derive(Error, Debug)]
pub enum WatchError {
    /// `start()` called on a running monitor
    #[error("monitor is already running")]
    AlreadyRunning,

    /// `start()` called after the monitor stopped
    #[error("monitor has stopped and cannot be restarted")]
    AlreadyStopped,

    /// Background thread could not be spawned
    #[error("failed to spawn monitor thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// A listener callback returned an error
    #[error("listener failed on {}: {source}", path.display())]
    Listener {
        kind: Option<ChangeKind>,
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// A listener callback panicked
    #[error("listener panicked on {}: {message}", path.display())]
    ListenerPanic { path: PathBuf, message: String },

    /// A whole observer cycle panicked
    #[error("observer for {} panicked: {message}", root.display())]
    ObserverPanic { root: PathBuf, message: String },

    /// Invalid exclusion pattern
    #[error("invalid exclude pattern: {0}")]
    Pattern(#[from] ignore::Error),
}

/// Extract a readable message from a panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
