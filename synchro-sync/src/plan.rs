//! Command plan — every external command a run may execute, built up front.
//!
//! [`CommandPlan::build`] is a pure function of the configuration: nothing is
//! executed and nothing is mutated afterwards. Steps that the option set turns
//! off are `None`.

use std::path::Path;

use serde::Serialize;

use synchro_core::{ArchiveFlags, Destination, SyncConfiguration};

use crate::destination::DestinationOps;
use crate::exec::CommandLine;

pub const ARCHIVE_OPTIONS: &[&str] = &["-cvpf"];
pub const EXTRACT_OPTIONS: &[&str] = &["-xvf"];
pub const TRANSFER_OPTIONS: &[&str] = &["-aP"];
pub const DRY_RUN_OPTIONS: &[&str] = &["-ai", "--dry-run"];

/// Ordered set of commands for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandPlan {
    pub dry_run: CommandLine,
    pub archive: Option<CommandLine>,
    pub transfer: CommandLine,
    pub extract: Option<CommandLine>,
    pub delete_destination_archive: Option<CommandLine>,
    pub chown: Option<CommandLine>,
    pub chmod: Option<CommandLine>,
}

impl CommandPlan {
    /// Build the plan for `config` transferring into `destination`.
    pub fn build(config: &SyncConfiguration, destination: &Destination) -> Self {
        let flags = config.archive_flags();
        let paths = config.paths();
        let excludes: Vec<String> = config
            .exclusions()
            .iter()
            .map(|pattern| format!("--exclude={pattern}"))
            .collect();
        let source_contents = contents_of(&paths.source);
        let destination_contents = format!("{}/", destination.transfer_address());
        let archive = display(&paths.archive);
        let destination_archive = paths
            .destination_archive
            .as_deref()
            .map(display)
            .unwrap_or_default();

        let dry_run = CommandLine::new(
            ["rsync"]
                .iter()
                .chain(DRY_RUN_OPTIONS)
                .map(|s| s.to_string())
                .chain(excludes.iter().cloned())
                .chain([source_contents.clone(), destination_contents.clone()]),
        );

        let (archive_cmd, transfer) = if flags.tar {
            let archive_cmd = CommandLine::new(
                ["tar".to_owned()]
                    .into_iter()
                    .chain(excludes.iter().cloned())
                    .chain(ARCHIVE_OPTIONS.iter().map(|s| s.to_string()))
                    .chain([
                        archive.clone(),
                        "-C".to_owned(),
                        display(&paths.source),
                        ".".to_owned(),
                    ]),
            );
            let transfer = CommandLine::new(
                ["rsync"]
                    .iter()
                    .chain(TRANSFER_OPTIONS)
                    .map(|s| s.to_string())
                    .chain([archive.clone(), destination.transfer_address()]),
            );
            (Some(archive_cmd), transfer)
        } else {
            let transfer = CommandLine::new(
                ["rsync"]
                    .iter()
                    .chain(TRANSFER_OPTIONS)
                    .map(|s| s.to_string())
                    .chain(excludes.iter().cloned())
                    .chain([source_contents, destination_contents]),
            );
            (None, transfer)
        };

        let extract = flags.untar.then(|| {
            destination.command(
                ["tar"]
                    .iter()
                    .chain(EXTRACT_OPTIONS)
                    .map(|s| s.to_string())
                    .chain([
                        destination_archive.clone(),
                        "-C".to_owned(),
                        display(destination.path()),
                    ]),
            )
        });

        let delete_destination_archive =
            (flags.untar && flags.delete_destination_archive).then(|| {
                destination.command(["rm".to_owned(), "-v".to_owned(), destination_archive.clone()])
            });

        let (chown, chmod) = if config.run_settings().change_permissions {
            let targets = permission_targets(flags, &destination_archive, destination.path());
            let target = &config.options().permission_target;
            let chown = target.chown_spec().map(|spec| {
                destination.command(
                    ["chown".to_owned(), "-R".to_owned(), spec]
                        .into_iter()
                        .chain(targets.iter().cloned()),
                )
            });
            let chmod = target.permissions.as_ref().map(|mode| {
                destination.command(
                    ["chmod".to_owned(), "-R".to_owned(), mode.clone()]
                        .into_iter()
                        .chain(targets.iter().cloned()),
                )
            });
            (chown, chmod)
        } else {
            (None, None)
        };

        Self {
            dry_run,
            archive: archive_cmd,
            transfer,
            extract,
            delete_destination_archive,
            chown,
            chmod,
        }
    }

    /// `(label, command)` pairs for every step present, in execution order.
    pub fn steps(&self) -> Vec<(&'static str, &CommandLine)> {
        let mut steps = vec![("dry run", &self.dry_run)];
        if let Some(cmd) = &self.archive {
            steps.push(("tar", cmd));
        }
        steps.push(("rsync", &self.transfer));
        let optional = [
            ("untar", &self.extract),
            ("deletion", &self.delete_destination_archive),
            ("chown", &self.chown),
            ("chmod", &self.chmod),
        ];
        for (label, cmd) in optional {
            if let Some(cmd) = cmd {
                steps.push((label, cmd));
            }
        }
        steps
    }
}

/// Paths whose ownership and mode are normalised after the transfer.
///
/// The archive is included while it remains at the destination; the
/// destination directory once the archive has been extracted into it.
fn permission_targets(flags: ArchiveFlags, archive: &str, destination: &Path) -> Vec<String> {
    let keeps_archive = flags.tar && !(flags.untar && flags.delete_destination_archive);
    let fills_destination = !flags.tar || flags.untar;
    let mut targets = Vec::new();
    if keeps_archive {
        targets.push(archive.to_owned());
    }
    if fills_destination {
        targets.push(display(destination));
    }
    targets
}

fn contents_of(dir: &Path) -> String {
    format!("{}/", dir.display())
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use rstest::rstest;
    use synchro_core::{
        NotificationSettings, PermissionTarget, RunSettings, SyncOptions, SyncPaths,
    };

    use super::*;

    fn paths(destination: &str) -> SyncPaths {
        let destination = Destination::parse(destination);
        SyncPaths {
            source: PathBuf::from("/data/project"),
            destination_archive: Some(destination.path().join("project.tar")),
            destination: Some(destination),
            archive: PathBuf::from("/data/project.tar"),
            log_file: PathBuf::from("/data/project/run.log"),
            ready_file: None,
            in_progress_file: PathBuf::from("/data/project/transfer.ongoing"),
            done_file: PathBuf::from("/data/project/transfer.done"),
        }
    }

    fn flags(tar: bool, untar: bool, delete_destination_archive: bool) -> ArchiveFlags {
        ArchiveFlags {
            tar,
            untar,
            delete_source_archive: tar,
            delete_destination_archive,
        }
    }

    fn config(destination: &str, archive: ArchiveFlags, change_permissions: bool) -> SyncConfiguration {
        let options = SyncOptions {
            archive,
            create_dest: true,
            create_dest_parents: true,
            permission_target: PermissionTarget {
                owner: Some("alice".into()),
                group: Some("staff".into()),
                permissions: Some("755".into()),
            },
            notifications: NotificationSettings::default(),
        };
        let run = RunSettings {
            change_permissions,
            cron: false,
        };
        SyncConfiguration::new(paths(destination), options, run).unwrap()
    }

    fn plan(destination: &str, archive: ArchiveFlags, change_permissions: bool) -> CommandPlan {
        let config = config(destination, archive, change_permissions);
        let dest = config.destination().unwrap().clone();
        CommandPlan::build(&config, &dest)
    }

    #[test]
    fn tar_untar_local_plan() {
        let plan = plan("/srv/out", flags(true, true, true), true);
        assert_eq!(
            plan.archive.as_ref().unwrap().argv(),
            [
                "tar",
                "--exclude=run.log",
                "--exclude=transfer.ongoing",
                "--exclude=transfer.done",
                "-cvpf",
                "/data/project.tar",
                "-C",
                "/data/project",
                "."
            ]
        );
        assert_eq!(
            plan.transfer.argv(),
            ["rsync", "-aP", "/data/project.tar", "/srv/out"]
        );
        assert_eq!(
            plan.extract.as_ref().unwrap().argv(),
            ["tar", "-xvf", "/srv/out/project.tar", "-C", "/srv/out"]
        );
        assert_eq!(
            plan.delete_destination_archive.as_ref().unwrap().argv(),
            ["rm", "-v", "/srv/out/project.tar"]
        );
        assert_eq!(
            plan.chown.as_ref().unwrap().argv(),
            ["chown", "-R", "alice:staff", "/srv/out"]
        );
        assert_eq!(
            plan.chmod.as_ref().unwrap().argv(),
            ["chmod", "-R", "755", "/srv/out"]
        );
    }

    #[test]
    fn dry_run_compares_directory_contents_with_exclusions() {
        let plan = plan("/srv/out", flags(true, true, true), false);
        assert_eq!(
            plan.dry_run.argv(),
            [
                "rsync",
                "-ai",
                "--dry-run",
                "--exclude=run.log",
                "--exclude=transfer.ongoing",
                "--exclude=transfer.done",
                "/data/project/",
                "/srv/out/"
            ]
        );
    }

    #[test]
    fn remote_destination_wraps_destination_side_steps() {
        let plan = plan("user@box:/srv/out", flags(true, true, true), true);
        assert_eq!(
            plan.transfer.argv(),
            ["rsync", "-aP", "/data/project.tar", "user@box:/srv/out"]
        );
        assert_eq!(
            plan.extract.as_ref().unwrap().argv(),
            ["ssh", "user@box", "tar", "-xvf", "/srv/out/project.tar", "-C", "/srv/out"]
        );
        assert_eq!(
            plan.delete_destination_archive.as_ref().unwrap().argv()[..3],
            ["ssh", "user@box", "rm"]
        );
        assert_eq!(plan.chown.as_ref().unwrap().argv()[..3], ["ssh", "user@box", "chown"]);
        assert_eq!(plan.dry_run.argv().last().unwrap(), "user@box:/srv/out/");
    }

    #[test]
    fn no_tar_transfers_contents_directly() {
        let plan = plan("/srv/out", flags(false, false, false), true);
        assert!(plan.archive.is_none());
        assert!(plan.extract.is_none());
        assert!(plan.delete_destination_archive.is_none());
        assert_eq!(
            plan.transfer.argv(),
            [
                "rsync",
                "-aP",
                "--exclude=run.log",
                "--exclude=transfer.ongoing",
                "--exclude=transfer.done",
                "/data/project/",
                "/srv/out/"
            ]
        );
    }

    #[test]
    fn no_permission_change_drops_chown_and_chmod() {
        let plan = plan("/srv/out", flags(true, true, true), false);
        assert!(plan.chown.is_none());
        assert!(plan.chmod.is_none());
        assert_eq!(
            plan.steps().iter().map(|(label, _)| *label).collect::<Vec<_>>(),
            ["dry run", "tar", "rsync", "untar", "deletion"]
        );
    }

    #[rstest]
    #[case(flags(true, true, false), &["/srv/out/project.tar", "/srv/out"])]
    #[case(flags(true, true, true), &["/srv/out"])]
    #[case(flags(true, false, false), &["/srv/out/project.tar"])]
    #[case(flags(false, false, false), &["/srv/out"])]
    fn permission_targets_follow_archive_flags(
        #[case] archive: ArchiveFlags,
        #[case] expected: &[&str],
    ) {
        let targets = permission_targets(archive, "/srv/out/project.tar", Path::new("/srv/out"));
        assert_eq!(targets, expected);
    }
}
