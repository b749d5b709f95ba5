//! The immutable configuration snapshot handed to the sync engine.

use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;

use crate::config::ConfigMap;
use crate::error::ConfigError;
use crate::options::{self, OptionOverrides, OptionWarning, SyncOptions};
use crate::paths::{SyncPaths, LOG_FILE_GLOB, TRANSFER_DONE_FILE, TRANSFER_ONGOING_FILE};
use crate::types::{ArchiveFlags, Destination, RunSettings};

/// Everything the caller knows before the config file is read.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub config_file: PathBuf,
    /// Source used when the config file has no `source` key.
    pub source: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub overrides: OptionOverrides,
    pub run: RunSettings,
}

/// Read-only view of one synchronisation: paths, options and run switches.
///
/// Construction enforces that the destination archive is never deleted
/// without being extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncConfiguration {
    paths: SyncPaths,
    options: SyncOptions,
    run: RunSettings,
    exclusions: Vec<String>,
    #[serde(skip)]
    warnings: Vec<OptionWarning>,
}

impl SyncConfiguration {
    /// Assemble a configuration from already-resolved parts.
    ///
    /// Returns [`ConfigError::ContradictoryArchiveFlags`] when
    /// `delete_destination_archive` is set without `untar`.
    pub fn new(
        paths: SyncPaths,
        options: SyncOptions,
        run: RunSettings,
    ) -> Result<Self, ConfigError> {
        let ArchiveFlags {
            untar,
            delete_destination_archive,
            ..
        } = options.archive;
        if delete_destination_archive && !untar {
            return Err(ConfigError::ContradictoryArchiveFlags);
        }
        let exclusions = exclusions_for(&paths, &run);
        Ok(Self {
            paths,
            options,
            run,
            exclusions,
            warnings: Vec::new(),
        })
    }

    /// Read the config file and resolve paths and options for `invocation`.
    pub fn load(invocation: &Invocation) -> Result<Self, ConfigError> {
        let config = ConfigMap::load(&invocation.config_file)?;
        Self::from_config(&config, invocation)
    }

    /// Resolve against an already-parsed config map.
    pub fn from_config(config: &ConfigMap, invocation: &Invocation) -> Result<Self, ConfigError> {
        let fallback = invocation
            .source
            .clone()
            .or_else(|| config_dir(&invocation.config_file));
        let paths = SyncPaths::resolve(
            config,
            fallback.as_deref(),
            invocation.log_file.clone(),
            Local::now(),
        )?;
        if !paths.source.is_dir() {
            return Err(ConfigError::SourceDirectory {
                path: paths.source.clone(),
            });
        }

        let resolved = options::resolve(config, &invocation.overrides, &paths.source)?;
        let mut configuration = Self::new(paths, resolved.options, invocation.run)?;
        configuration.warnings = resolved.warnings;
        Ok(configuration)
    }

    pub fn paths(&self) -> &SyncPaths {
        &self.paths
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    pub fn run_settings(&self) -> RunSettings {
        self.run
    }

    pub fn source(&self) -> &Path {
        &self.paths.source
    }

    pub fn destination(&self) -> Option<&Destination> {
        self.paths.destination.as_ref()
    }

    pub fn archive_flags(&self) -> ArchiveFlags {
        self.options.archive
    }

    /// Patterns kept out of the archive, the transfer and the dry run.
    pub fn exclusions(&self) -> &[String] {
        &self.exclusions
    }

    /// Warnings produced while resolving options.
    pub fn warnings(&self) -> &[OptionWarning] {
        &self.warnings
    }

    /// Cron mode suppresses the done sentinel.
    pub fn writes_done_file(&self) -> bool {
        !self.run.cron
    }
}

fn config_dir(config_file: &Path) -> Option<PathBuf> {
    config_file
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .or_else(|| Some(PathBuf::from(".")))
}

fn exclusions_for(paths: &SyncPaths, run: &RunSettings) -> Vec<String> {
    let mut patterns = Vec::new();
    let log_name = paths.log_file_name();
    if !log_name.is_empty() {
        patterns.push(log_name);
    }
    patterns.push(TRANSFER_ONGOING_FILE.to_owned());
    patterns.push(TRANSFER_DONE_FILE.to_owned());
    if run.cron {
        patterns.push(LOG_FILE_GLOB.to_owned());
    }
    patterns
}

#[cfg(test)]
mod tests {
    use chrono::Local;

    use super::*;
    use crate::types::{NotificationSettings, PermissionTarget};

    fn paths() -> SyncPaths {
        SyncPaths::resolve(
            &ConfigMap::parse("destination = /out\n"),
            Some(Path::new("/data/project")),
            Some(PathBuf::from("/data/project/run.log")),
            Local::now(),
        )
        .unwrap()
    }

    fn options(archive: ArchiveFlags) -> SyncOptions {
        SyncOptions {
            archive,
            create_dest: true,
            create_dest_parents: true,
            permission_target: PermissionTarget::default(),
            notifications: NotificationSettings::default(),
        }
    }

    #[test]
    fn contradictory_archive_flags_are_rejected() {
        let archive = ArchiveFlags {
            tar: true,
            untar: false,
            delete_source_archive: true,
            delete_destination_archive: true,
        };
        let err = SyncConfiguration::new(paths(), options(archive), RunSettings::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::ContradictoryArchiveFlags));
    }

    #[test]
    fn cron_adds_log_glob_and_skips_done_file() {
        let archive = ArchiveFlags {
            tar: true,
            untar: true,
            delete_source_archive: true,
            delete_destination_archive: true,
        };
        let run = RunSettings {
            change_permissions: false,
            cron: true,
        };
        let config = SyncConfiguration::new(paths(), options(archive), run).unwrap();
        assert_eq!(
            config.exclusions(),
            ["run.log", "transfer.ongoing", "transfer.done", "synchro_*.log"]
        );
        assert!(!config.writes_done_file());
    }

    #[test]
    fn config_dir_of_bare_file_name_is_cwd() {
        assert_eq!(
            config_dir(Path::new("synchro.conf")),
            Some(PathBuf::from("."))
        );
        assert_eq!(
            config_dir(Path::new("/data/project/synchro.conf")),
            Some(PathBuf::from("/data/project"))
        );
    }
}
