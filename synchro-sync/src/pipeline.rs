//! Shared entrypoint: load the configuration for an invocation and run it.

use synchro_core::{Invocation, SyncConfiguration};

use crate::engine::{SyncEngine, SyncOutcome};
use crate::error::SyncError;
use crate::exec::{CommandRunner, SystemRunner};

/// The configuration a run used and how it ended.
#[derive(Debug)]
pub struct PipelineResult {
    pub config: SyncConfiguration,
    pub outcome: SyncOutcome,
}

/// Run one synchronisation with real external tools.
pub fn run(invocation: &Invocation) -> Result<PipelineResult, SyncError> {
    run_with(invocation, SystemRunner)
}

/// Run one synchronisation with `runner` executing the commands.
pub fn run_with<R: CommandRunner>(
    invocation: &Invocation,
    runner: R,
) -> Result<PipelineResult, SyncError> {
    let config = SyncConfiguration::load(invocation)?;
    for warning in config.warnings() {
        tracing::warn!("{warning}");
    }

    let engine = SyncEngine::new(config, runner);
    let outcome = engine.run()?;
    if let SyncOutcome::Blocked(reason) = outcome {
        tracing::info!("Not running synchronisation: {reason}");
    }
    Ok(PipelineResult {
        config: engine.into_config(),
        outcome,
    })
}

#[cfg(test)]
mod tests {
    use synchro_core::{ConfigError, OptionOverrides};
    use tempfile::TempDir;

    use super::*;
    use crate::engine::BlockReason;

    fn invocation(dir: &TempDir) -> Invocation {
        Invocation {
            config_file: dir.path().join("synchro.conf"),
            overrides: OptionOverrides {
                owner: Some("1000".into()),
                group: Some("1000".into()),
                ..OptionOverrides::default()
            },
            ..Invocation::default()
        }
    }

    #[test]
    fn missing_config_file_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let err = run(&invocation(&dir)).unwrap_err();
        assert!(
            matches!(err, SyncError::Config(ConfigError::ConfigFile { .. })),
            "got: {err}"
        );
    }

    #[test]
    fn done_file_blocks_before_anything_runs() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("synchro.conf"), "destination = /nonexistent/out\n")
            .unwrap();
        std::fs::write(dir.path().join("transfer.done"), "").unwrap();

        let result = run(&invocation(&dir)).unwrap();

        assert_eq!(result.outcome, SyncOutcome::Blocked(BlockReason::AlreadyDone));
        assert_eq!(result.config.source(), dir.path());
        let logs = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".log"))
            .count();
        assert_eq!(logs, 0);
    }
}
