//! Filesystem locations for a synchronisation run.
//!
//! Every persisted marker lives inside the source directory:
//!
//! ```text
//! <parent>/
//!   <source>.tar               archive, beside the source directory
//!   <source>/
//!     transfer.done            written after a successful run
//!     transfer.ongoing         present while a run is active
//!     <transfer_ready_file>    optional, created by the operator
//!     synchro_<timestamp>.log  default run log
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::config::ConfigMap;
use crate::error::ConfigError;
use crate::types::Destination;

pub const TRANSFER_DONE_FILE: &str = "transfer.done";
pub const TRANSFER_ONGOING_FILE: &str = "transfer.ongoing";

/// Prefix of every run log synchro writes by default.
pub const LOG_FILE_PREFIX: &str = "synchro";

/// Glob matching every default run log, used to keep logs out of transfers.
pub const LOG_FILE_GLOB: &str = "synchro_*.log";

/// Resolved locations for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncPaths {
    pub source: PathBuf,
    /// `None` when the configuration has no `destination` key.
    pub destination: Option<Destination>,
    pub archive: PathBuf,
    /// Archive path on the destination machine.
    pub destination_archive: Option<PathBuf>,
    pub log_file: PathBuf,
    pub ready_file: Option<PathBuf>,
    pub in_progress_file: PathBuf,
    pub done_file: PathBuf,
}

impl SyncPaths {
    /// Derive every location from the configuration.
    ///
    /// The `source` key wins over `fallback_source`; with neither present the
    /// result is [`ConfigError::MissingSource`]. A missing `destination` is not
    /// an error here, the engine refuses to start instead.
    pub fn resolve(
        config: &ConfigMap,
        fallback_source: Option<&Path>,
        log_file: Option<PathBuf>,
        now: DateTime<Local>,
    ) -> Result<Self, ConfigError> {
        let source = config
            .get("source")
            .map(PathBuf::from)
            .or_else(|| fallback_source.map(Path::to_path_buf))
            .ok_or(ConfigError::MissingSource)?;

        let destination = config
            .get("destination")
            .filter(|value| !value.is_empty())
            .map(Destination::parse);

        let archive = archive_path(&source);
        let destination_archive = destination.as_ref().map(|dest| {
            let name = archive.file_name().map(PathBuf::from).unwrap_or_default();
            dest.path().join(name)
        });

        let ready_file = config
            .get("transfer_ready_file")
            .filter(|value| !value.is_empty())
            .map(|name| source.join(name));

        let log_file = log_file.unwrap_or_else(|| default_log_file(&source, now));

        Ok(Self {
            in_progress_file: source.join(TRANSFER_ONGOING_FILE),
            done_file: source.join(TRANSFER_DONE_FILE),
            source,
            destination,
            archive,
            destination_archive,
            log_file,
            ready_file,
        })
    }

    /// File name of the active run log, used as a transfer exclusion.
    pub fn log_file_name(&self) -> String {
        self.log_file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// `<parent>/<source-name>.tar`
pub fn archive_path(source: &Path) -> PathBuf {
    let name = source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "source".to_owned());
    let parent = source.parent().unwrap_or_else(|| Path::new(""));
    parent.join(format!("{name}.tar"))
}

/// `<source>/synchro_<YYYY-mm-dd_HH-MM-SS>.log`
pub fn default_log_file(source: &Path, now: DateTime<Local>) -> PathBuf {
    source.join(format!(
        "{LOG_FILE_PREFIX}_{}.log",
        now.format("%Y-%m-%d_%H-%M-%S")
    ))
}
