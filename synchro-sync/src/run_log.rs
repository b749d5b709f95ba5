//! Per-run log file.
//!
//! A [`RunLog`] is opened once a run has passed its readiness gates and is
//! dropped when the run returns. Every line goes to the file verbatim and is
//! mirrored to `tracing` at the matching level, so the file holds the full
//! debug narration and the console shows what the subscriber lets through.

use std::fs::{File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{io_err, SyncError};

/// Written immediately before the dry-run trace.
pub const DRY_RUN_START_MARKER: &str = "------------ DRY RUN START ------------";
/// Written immediately after the dry-run trace.
pub const DRY_RUN_END_MARKER: &str = "------------- DRY RUN END -------------";

/// Append-only log sink scoped to one synchronisation run.
pub struct RunLog {
    path: PathBuf,
    file: LineWriter<File>,
    write_failed: bool,
}

impl RunLog {
    /// Open (or create) the log file at `path` for appending.
    pub fn open(path: &Path) -> Result<Self, SyncError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| io_err(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            file: LineWriter::new(file),
            write_failed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn error(&mut self, message: &str) {
        tracing::error!("{message}");
        self.append(message);
    }

    pub fn warn(&mut self, message: &str) {
        tracing::warn!("{message}");
        self.append(message);
    }

    pub fn info(&mut self, message: &str) {
        tracing::info!("{message}");
        self.append(message);
    }

    pub fn debug(&mut self, message: &str) {
        tracing::debug!("{message}");
        self.append(message);
    }

    fn append(&mut self, message: &str) {
        if let Err(err) = writeln!(self.file, "{message}") {
            // Write failures never abort the run; only the first is reported.
            if !self.write_failed {
                self.write_failed = true;
                tracing::warn!(path = %self.path.display(), error = %err, "run log write failed");
            }
        }
    }
}

/// Text between the most recent pair of dry-run markers in `log_file`.
///
/// Returns an empty string when no complete pair is present.
pub fn dry_run_excerpt(log_file: &Path) -> Result<String, SyncError> {
    let contents = std::fs::read_to_string(log_file).map_err(|e| io_err(log_file, e))?;
    let mut capturing: Option<Vec<&str>> = None;
    let mut last = Vec::new();
    for line in contents.lines() {
        match line.trim() {
            DRY_RUN_START_MARKER => capturing = Some(Vec::new()),
            DRY_RUN_END_MARKER => {
                if let Some(lines) = capturing.take() {
                    last = lines;
                }
            }
            _ => {
                if let Some(lines) = capturing.as_mut() {
                    lines.push(line);
                }
            }
        }
    }
    Ok(last.join("\n"))
}
