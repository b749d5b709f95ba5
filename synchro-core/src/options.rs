//! Option resolution: caller values, then the config file, then built-in defaults.
//!
//! Each boolean flag is resolved in this order:
//! 1. an explicit caller value ([`OptionOverrides`] field set to `Some`)
//! 2. the config file (`y` is true, any other value false)
//! 3. the compiled-in default, recorded as an [`OptionWarning::FlagDefaulted`]
//!
//! Afterwards the archive flags are made consistent: without `tar` nothing is
//! extracted or deleted, and a destination archive is never deleted unless it
//! was extracted first.

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::config::ConfigMap;
use crate::error::{io_err, ConfigError};
use crate::types::{ArchiveFlags, NotificationSettings, PermissionTarget};

pub const DEFAULT_TAR: bool = true;
pub const DEFAULT_UNTAR: bool = false;
pub const DEFAULT_CREATE_DEST: bool = false;
pub const DEFAULT_CREATE_DEST_PARENTS: bool = true;
pub const DEFAULT_DELETE_SOURCE_ARCHIVE: bool = true;
pub const DEFAULT_DELETE_DESTINATION_ARCHIVE: bool = true;
pub const DEFAULT_EMAIL_ON_START: bool = false;
pub const DEFAULT_EMAIL_ON_END: bool = false;

/// Values supplied by the caller. `None` defers to the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionOverrides {
    pub tar: Option<bool>,
    pub untar: Option<bool>,
    pub create_dest: Option<bool>,
    pub create_dest_parents: Option<bool>,
    pub delete_source_archive: Option<bool>,
    pub delete_destination_archive: Option<bool>,
    pub owner: Option<String>,
    pub group: Option<String>,
    pub permissions: Option<String>,
    pub email_address: Option<String>,
    pub email_on_start: Option<bool>,
    pub email_on_end: Option<bool>,
}

/// Fully resolved, mutually consistent option set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncOptions {
    pub archive: ArchiveFlags,
    pub create_dest: bool,
    pub create_dest_parents: bool,
    pub permission_target: PermissionTarget,
    pub notifications: NotificationSettings,
}

/// Something the resolver had to decide on the user's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionWarning {
    /// The key was absent from the config file; the built-in default applies.
    FlagDefaulted { key: &'static str, value: bool },
    /// `delete_destination_archive` was requested without `untar`.
    DestinationArchiveKept,
}

impl fmt::Display for OptionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionWarning::FlagDefaulted { key, value } => {
                write!(f, "{key} option not set in config file. Setting to: {value}")
            }
            OptionWarning::DestinationArchiveKept => write!(
                f,
                "option to delete destination tar, but not extract first selected. \
                 Defaulting to not delete destination tar"
            ),
        }
    }
}

/// Output of [`resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOptions {
    pub options: SyncOptions,
    pub warnings: Vec<OptionWarning>,
}

/// Merge caller overrides with the config file.
///
/// `source` is consulted only when neither caller nor config names an owner
/// or group: the source directory's current uid/gid are used instead.
pub fn resolve(
    config: &ConfigMap,
    overrides: &OptionOverrides,
    source: &Path,
) -> Result<ResolvedOptions, ConfigError> {
    let mut warnings = Vec::new();
    let mut flag = |key: &'static str, explicit: Option<bool>, default: bool| {
        resolve_flag(config, key, explicit, default, &mut warnings)
    };

    let create_dest = flag("create_dest", overrides.create_dest, DEFAULT_CREATE_DEST);
    let tar = flag("tar", overrides.tar, DEFAULT_TAR);
    let (untar, delete_source_archive) = if tar {
        (
            flag("untar", overrides.untar, DEFAULT_UNTAR),
            overrides
                .delete_source_archive
                .unwrap_or(DEFAULT_DELETE_SOURCE_ARCHIVE),
        )
    } else {
        (false, false)
    };
    let email_on_start = flag(
        "email_on_start",
        overrides.email_on_start,
        DEFAULT_EMAIL_ON_START,
    );
    let email_on_end = flag("email_on_end", overrides.email_on_end, DEFAULT_EMAIL_ON_END);

    let mut delete_destination_archive = tar
        && overrides
            .delete_destination_archive
            .unwrap_or(DEFAULT_DELETE_DESTINATION_ARCHIVE);
    if delete_destination_archive && !untar {
        warnings.push(OptionWarning::DestinationArchiveKept);
        delete_destination_archive = false;
    }

    let mut owner = pick_string(config, "owner", overrides.owner.as_ref());
    let mut group = pick_string(config, "group", overrides.group.as_ref());
    if owner.is_none() || group.is_none() {
        let (uid, gid) = source_ownership(source)?;
        owner = owner.or(uid);
        group = group.or(gid);
    }

    let options = SyncOptions {
        archive: ArchiveFlags {
            tar,
            untar,
            delete_source_archive,
            delete_destination_archive,
        },
        create_dest,
        create_dest_parents: overrides
            .create_dest_parents
            .unwrap_or(DEFAULT_CREATE_DEST_PARENTS),
        permission_target: PermissionTarget {
            owner,
            group,
            permissions: pick_string(config, "permissions", overrides.permissions.as_ref()),
        },
        notifications: NotificationSettings {
            recipient: pick_string(config, "email_address", overrides.email_address.as_ref()),
            on_start: email_on_start,
            on_end: email_on_end,
        },
    };

    Ok(ResolvedOptions { options, warnings })
}

fn resolve_flag(
    config: &ConfigMap,
    key: &'static str,
    explicit: Option<bool>,
    default: bool,
    warnings: &mut Vec<OptionWarning>,
) -> bool {
    if let Some(value) = explicit {
        return value;
    }
    match config.flag(key) {
        Some(value) => value,
        None => {
            warnings.push(OptionWarning::FlagDefaulted {
                key,
                value: default,
            });
            default
        }
    }
}

fn pick_string(config: &ConfigMap, key: &str, explicit: Option<&String>) -> Option<String> {
    explicit
        .cloned()
        .or_else(|| config.get(key).filter(|v| !v.is_empty()).map(str::to_owned))
}

#[cfg(unix)]
fn source_ownership(source: &Path) -> Result<(Option<String>, Option<String>), ConfigError> {
    use std::os::unix::fs::MetadataExt;

    match std::fs::metadata(source) {
        Ok(meta) => Ok((Some(meta.uid().to_string()), Some(meta.gid().to_string()))),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            Err(ConfigError::SourceDirectory {
                path: source.to_path_buf(),
            })
        }
        Err(err) => Err(io_err(source, err)),
    }
}

#[cfg(not(unix))]
fn source_ownership(_source: &Path) -> Result<(Option<String>, Option<String>), ConfigError> {
    Ok((None, None))
}
