//! Error types for synchro-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while building a synchronisation configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file is missing or unreadable.
    #[error("no config file exists at {path}: {source}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Neither the configuration nor the caller supplied a source directory.
    #[error("source directory is not set in the config file and none was supplied")]
    MissingSource,

    /// The source directory does not exist.
    #[error("source directory: {path} does not exist")]
    SourceDirectory { path: PathBuf },

    /// The destination archive would be deleted without ever being extracted.
    #[error("destination archive deletion requested without extraction (untar is off)")]
    ContradictoryArchiveFlags,

    /// Reading metadata of an existing path failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
