//! Snapshot model and tree diffing for fsmon
//!
//! This crate provides:
//! - Point-in-time recursive snapshots of a file or directory
//! - Inclusion predicates (`PathFilter`) applied while snapshotting
//! - Diffing of two snapshots into an ordered list of typed changes

pub mod diff;
pub mod filter;
pub mod snapshot;

// Re-exports
pub use diff::{diff, Change, ChangeKind};
pub use filter::{AcceptAll, PathFilter};
pub use snapshot::{EntryKind, Snapshot};
