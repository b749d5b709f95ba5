//! Error types for synchro-sync.

use std::path::PathBuf;

use thiserror::Error;

use synchro_core::ConfigError;

/// All errors that can abort a synchronisation run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration could not be loaded or was inconsistent.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Destination is missing and `create_dest` is off.
    #[error("destination directory: {path} does not exist")]
    DestinationDirectory { path: String },

    /// The dry-run produced a line that is not `<code> <path>`.
    #[error("malformed dry-run line: {line:?}")]
    MalformedDryRunLine { line: String },

    /// The in-progress sentinel appeared between the readiness check and its
    /// creation: another run is racing this one.
    #[error("in-progress sentinel already exists at {path}")]
    SentinelCollision { path: PathBuf },

    /// An external command exited unsuccessfully.
    #[error("command `{command}` failed with status {code:?}")]
    CommandFailed { command: String, code: Option<i32> },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
