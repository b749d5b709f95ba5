//! Domain types shared by the resolver and the sync engine.
//!
//! All path fields use `PathBuf`. Every type here is a plain value: built once
//! per invocation and never mutated afterwards.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

// ---------------------------------------------------------------------------
// Destination
// ---------------------------------------------------------------------------

/// Where the transfer lands: a local directory or `host:path` on another machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Destination {
    Local { path: PathBuf },
    Remote { host: String, path: PathBuf },
}

impl Destination {
    /// Classify a destination address by splitting on its first colon.
    ///
    /// `user@box:/srv/data` is remote (`user@box`, `/srv/data`); anything
    /// without a colon is a local path.
    pub fn parse(address: &str) -> Self {
        match address.split_once(':') {
            Some((host, path)) => Destination::Remote {
                host: host.to_owned(),
                path: PathBuf::from(path),
            },
            None => Destination::Local {
                path: PathBuf::from(address),
            },
        }
    }

    /// Directory path as seen on the machine that holds it.
    pub fn path(&self) -> &Path {
        match self {
            Destination::Local { path } | Destination::Remote { path, .. } => path,
        }
    }

    pub fn host(&self) -> Option<&str> {
        match self {
            Destination::Local { .. } => None,
            Destination::Remote { host, .. } => Some(host),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Destination::Remote { .. })
    }

    /// Prefix `argv` so it executes wherever the destination lives.
    pub fn wrap(&self, argv: Vec<String>) -> Vec<String> {
        match self {
            Destination::Local { .. } => argv,
            Destination::Remote { host, .. } => {
                let mut wrapped = Vec::with_capacity(argv.len() + 2);
                wrapped.push("ssh".to_owned());
                wrapped.push(host.clone());
                wrapped.extend(argv);
                wrapped
            }
        }
    }

    /// Address understood by the transfer tool (`path` or `host:path`).
    pub fn transfer_address(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Local { path } => write!(f, "{}", path.display()),
            Destination::Remote { host, path } => write!(f, "{host}:{}", path.display()),
        }
    }
}

// ---------------------------------------------------------------------------
// Option groups
// ---------------------------------------------------------------------------

/// Which archive steps run around the transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArchiveFlags {
    pub tar: bool,
    pub untar: bool,
    pub delete_source_archive: bool,
    pub delete_destination_archive: bool,
}

/// Ownership and mode applied to the destination after a transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PermissionTarget {
    pub owner: Option<String>,
    pub group: Option<String>,
    /// Mode string handed to `chmod -R`, e.g. `"755"` or `"u+rwX"`.
    pub permissions: Option<String>,
}

impl PermissionTarget {
    /// `owner:group` spec for `chown`, or `None` when neither is known.
    pub fn chown_spec(&self) -> Option<String> {
        match (&self.owner, &self.group) {
            (Some(owner), Some(group)) => Some(format!("{owner}:{group}")),
            (Some(owner), None) => Some(owner.clone()),
            (None, Some(group)) => Some(format!(":{group}")),
            (None, None) => None,
        }
    }
}

/// Email notification settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotificationSettings {
    pub recipient: Option<String>,
    pub on_start: bool,
    pub on_end: bool,
}

/// Per-invocation switches supplied on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSettings {
    /// Apply chown/chmod at the destination after transfer.
    pub change_permissions: bool,
    /// Cron mode: never write the done sentinel and keep every synchro log
    /// out of the transfer.
    pub cron: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            change_permissions: true,
            cron: false,
        }
    }
}
