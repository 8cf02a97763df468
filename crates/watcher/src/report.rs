//! Line-oriented textual adapter
//!
//! Writes one line per event: `C <path>` for creates, `M <path>` for file
//! modifications and `D <path>` for deletes, files and directories alike.

use crate::listener::Listener;
use anyhow::Result;
use fsmon_core::ChangeKind;
use parking_lot::Mutex;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Listener printing each event as a single line
pub struct LineReporter<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> LineReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Log which roots are being watched
    pub fn announce(&self, roots: &[PathBuf]) {
        for root in roots {
            info!("Watching {}", root.display());
        }
    }

    /// Recover the underlying writer
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn line(&self, kind: ChangeKind, path: &Path) -> Result<()> {
        let mut out = self.out.lock();
        writeln!(out, "{} {}", kind.code(), path.display())?;
        out.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> Listener for LineReporter<W> {
    fn on_directory_create(&self, path: &Path) -> Result<()> {
        self.line(ChangeKind::Create, path)
    }

    fn on_directory_delete(&self, path: &Path) -> Result<()> {
        self.line(ChangeKind::Delete, path)
    }

    fn on_file_create(&self, path: &Path) -> Result<()> {
        self.line(ChangeKind::Create, path)
    }

    fn on_file_change(&self, path: &Path) -> Result<()> {
        self.line(ChangeKind::Modify, path)
    }

    fn on_file_delete(&self, path: &Path) -> Result<()> {
        self.line(ChangeKind::Delete, path)
    }
}
