//! Polling file system monitor for fsmon
//!
//! This crate provides:
//! - `Observer`: one watched root, diffed against its previous snapshot
//! - `Listener`: callbacks for file and directory create / modify / delete
//! - `Monitor`: a background scheduler scanning its observers at an interval
//! - `IgnoreFilter`: gitignore-style exclusion for observers
//! - `LineReporter`: `C|M|D <path>` textual output

pub mod error;
pub mod filter;
pub mod listener;
pub mod monitor;
pub mod observer;
pub mod report;

// Re-exports
pub use error::{Result, WatchError};
pub use filter::{FilterConfig, IgnoreFilter};
pub use fsmon_core::{AcceptAll, Change, ChangeKind, EntryKind, PathFilter, Snapshot};
pub use listener::Listener;
pub use monitor::{Monitor, MonitorConfig, MonitorState, SharedObserver};
pub use observer::{CycleReport, Observer};
pub use report::LineReporter;
