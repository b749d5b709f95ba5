//! Destination operations that work the same way for local and remote targets.

use synchro_core::Destination;

use crate::error::{io_err, SyncError};
use crate::exec::{CommandLine, CommandRunner};

/// Marker echoed by the remote shell when the directory exists.
const REMOTE_EXISTS_MARKER: &str = "dir_exists";

/// Existence, creation and command placement for a [`Destination`].
pub trait DestinationOps {
    /// Whether the destination directory exists. Remote probe failures
    /// (unreachable host, non-zero exit) count as "does not exist".
    fn exists(&self, runner: &dyn CommandRunner) -> bool;

    /// Create the destination directory, optionally with its parents.
    fn create(
        &self,
        runner: &dyn CommandRunner,
        parents: bool,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<(), SyncError>;

    /// Build a command that executes on the machine holding the destination.
    fn command<I, S>(&self, argv: I) -> CommandLine
    where
        I: IntoIterator<Item = S>,
        S: Into<String>;
}

impl DestinationOps for Destination {
    fn exists(&self, runner: &dyn CommandRunner) -> bool {
        match self {
            Destination::Local { path } => path.is_dir(),
            Destination::Remote { host, path } => {
                let probe = CommandLine::new([
                    "ssh".to_owned(),
                    host.clone(),
                    format!(
                        "[ -d '{}' ] && echo '{REMOTE_EXISTS_MARKER}'",
                        path.display()
                    ),
                ]);
                let mut found = false;
                let result = runner.run(&probe, &mut |line| {
                    if line.trim() == REMOTE_EXISTS_MARKER {
                        found = true;
                    }
                });
                result.is_ok() && found
            }
        }
    }

    fn create(
        &self,
        runner: &dyn CommandRunner,
        parents: bool,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<(), SyncError> {
        match self {
            Destination::Local { path } => {
                let result = if parents {
                    std::fs::create_dir_all(path)
                } else {
                    std::fs::create_dir(path)
                };
                result.map_err(|e| io_err(path, e))
            }
            Destination::Remote { path, .. } => {
                let mut argv = vec!["mkdir".to_owned()];
                if parents {
                    argv.push("-p".to_owned());
                }
                argv.push(path.display().to_string());
                runner.run(&self.command(argv), on_line)
            }
        }
    }

    fn command<I, S>(&self, argv: I) -> CommandLine
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandLine::new(self.wrap(argv.into_iter().map(Into::into).collect()))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use tempfile::TempDir;

    use super::*;

    /// Replays a fixed response and records what was asked of it.
    struct Canned {
        lines: Vec<&'static str>,
        fail: bool,
        seen: RefCell<Vec<CommandLine>>,
    }

    impl Canned {
        fn new(lines: Vec<&'static str>, fail: bool) -> Self {
            Self {
                lines,
                fail,
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl CommandRunner for Canned {
        fn run(
            &self,
            command: &CommandLine,
            on_line: &mut dyn FnMut(&str),
        ) -> Result<(), SyncError> {
            self.seen.borrow_mut().push(command.clone());
            for line in &self.lines {
                on_line(line);
            }
            if self.fail {
                return Err(SyncError::CommandFailed {
                    command: command.to_string(),
                    code: Some(255),
                });
            }
            Ok(())
        }

        fn run_with_input(
            &self,
            command: &CommandLine,
            _input: &str,
            on_line: &mut dyn FnMut(&str),
        ) -> Result<(), SyncError> {
            self.run(command, on_line)
        }
    }

    #[test]
    fn local_exists_and_create_use_the_filesystem() {
        let root = TempDir::new().unwrap();
        let dest = Destination::parse(&root.path().join("a/b").display().to_string());
        let runner = Canned::new(vec![], false);
        assert!(!dest.exists(&runner));
        dest.create(&runner, true, &mut |_| {}).unwrap();
        assert!(dest.exists(&runner));
        assert!(runner.seen.borrow().is_empty(), "local ops must not shell out");
    }

    #[test]
    fn local_create_without_parents_fails_on_missing_parent() {
        let root = TempDir::new().unwrap();
        let dest = Destination::parse(&root.path().join("a/b").display().to_string());
        let err = dest
            .create(&Canned::new(vec![], false), false, &mut |_| {})
            .unwrap_err();
        assert!(matches!(err, SyncError::Io { .. }), "got: {err}");
    }

    #[test]
    fn remote_exists_reads_marker() {
        let dest = Destination::parse("box:/srv/in");
        let runner = Canned::new(vec!["dir_exists"], false);
        assert!(dest.exists(&runner));
        let seen = runner.seen.borrow();
        assert_eq!(
            seen[0].argv(),
            ["ssh", "box", "[ -d '/srv/in' ] && echo 'dir_exists'"]
        );
    }

    #[test]
    fn remote_probe_failure_means_absent() {
        let dest = Destination::parse("box:/srv/in");
        assert!(!dest.exists(&Canned::new(vec![], true)));
        assert!(!dest.exists(&Canned::new(vec!["dir_exists"], true)));
    }

    #[test]
    fn remote_create_runs_mkdir_over_ssh() {
        let dest = Destination::parse("box:/srv/in");
        let runner = Canned::new(vec![], false);
        dest.create(&runner, true, &mut |_| {}).unwrap();
        assert_eq!(
            runner.seen.borrow()[0].argv(),
            ["ssh", "box", "mkdir", "-p", "/srv/in"]
        );
    }
}
