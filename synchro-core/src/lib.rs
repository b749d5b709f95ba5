//! Synchro core library — configuration reading, path and option resolution.
//!
//! - [`config`] — the `synchro.conf` key/value reader
//! - [`paths`] — source, destination, archive and sentinel locations
//! - [`options`] — flag resolution and consistency rules
//! - [`configuration`] — the immutable [`SyncConfiguration`] snapshot
//! - [`error`] — [`ConfigError`]

pub mod config;
pub mod configuration;
pub mod error;
pub mod options;
pub mod paths;
pub mod types;

pub use config::{ConfigMap, DEFAULT_CONFIG_FILE};
pub use configuration::{Invocation, SyncConfiguration};
pub use error::ConfigError;
pub use options::{OptionOverrides, OptionWarning, SyncOptions};
pub use paths::SyncPaths;
pub use types::{ArchiveFlags, Destination, NotificationSettings, PermissionTarget, RunSettings};
