//! The synchronisation state machine.
//!
//! ```text
//! NotReady ──gates pass──▶ InProgress ──no changes──▶ SkippedNoOp
//!                              │
//!                              ├──changes, all steps ok──▶ Completed
//!                              └──any step fails─────────▶ Aborted (error)
//! ```
//!
//! ## Readiness gates, in order
//!
//! 1. A destination is configured.
//! 2. The source directory exists.
//! 3. `transfer.ongoing` is absent.
//! 4. `transfer.done` is absent.
//! 5. The ready file, when one is configured, is present.
//!
//! A failed gate is a blocked run, never an error. Once the gates pass,
//! `transfer.ongoing` is created and then the run log is opened; from then on,
//! whatever happens, the marker is removed and the log footer written before
//! returning.

use std::fmt;

use chrono::{DateTime, Local};
use serde::Serialize;

use synchro_core::{ConfigError, Destination, SyncConfiguration};

use crate::destination::DestinationOps;
use crate::error::{io_err, SyncError};
use crate::exec::{CommandLine, CommandRunner};
use crate::itemize::ChangeDetector;
use crate::notify::{Notification, NotificationGate};
use crate::plan::CommandPlan;
use crate::run_log::{RunLog, DRY_RUN_END_MARKER, DRY_RUN_START_MARKER};
use crate::sentinel;

const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Why a run did not start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    DestinationUnset,
    InProgress,
    AlreadyDone,
    NotReady,
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BlockReason::DestinationUnset => "destination directory is not set in the config file",
            BlockReason::InProgress => "existing transfer is still in progress",
            BlockReason::AlreadyDone => "transfer has already completed",
            BlockReason::NotReady => "transfer ready file does not exist",
        })
    }
}

/// How a run ended, when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum SyncOutcome {
    Blocked(BlockReason),
    /// The dry run found nothing to transfer.
    SkippedNoOp,
    Completed,
}

impl SyncOutcome {
    pub fn transferred(&self) -> bool {
        matches!(self, SyncOutcome::Completed)
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Runs one synchronisation for a fixed configuration.
pub struct SyncEngine<R> {
    config: SyncConfiguration,
    runner: R,
}

impl<R: CommandRunner> SyncEngine<R> {
    pub fn new(config: SyncConfiguration, runner: R) -> Self {
        Self { config, runner }
    }

    pub fn config(&self) -> &SyncConfiguration {
        &self.config
    }

    pub fn into_config(self) -> SyncConfiguration {
        self.config
    }

    /// Check readiness and, when ready, run the transfer.
    pub fn run(&self) -> Result<SyncOutcome, SyncError> {
        let destination = match self.check_ready()? {
            Ok(destination) => destination,
            Err(reason) => return Ok(SyncOutcome::Blocked(reason)),
        };

        let started = Local::now();
        let plan = CommandPlan::build(&self.config, destination);
        let mut log = self.enter_in_progress()?;
        self.write_header(&mut log, &plan, destination, started);

        let result = self.transfer(&mut log, &plan, destination);
        if let Err(err) = &result {
            log.error(&err.to_string());
            log.error("SYNC FAILED");
        }

        let in_progress = &self.config.paths().in_progress_file;
        if let Err(err) = sentinel::remove(in_progress) {
            log.error(&format!("could not remove {}: {err}", in_progress.display()));
        }
        write_footer(&mut log, started);
        result
    }

    /// Claim `transfer.ongoing`, then open the run log.
    ///
    /// A run that loses the race for the marker reports through `tracing` only
    /// and leaves no log file behind.
    fn enter_in_progress(&self) -> Result<RunLog, SyncError> {
        let paths = self.config.paths();
        if let Err(err) = sentinel::touch_exclusive(&paths.in_progress_file) {
            tracing::error!("{err}");
            return Err(err);
        }
        match RunLog::open(&paths.log_file) {
            Ok(log) => Ok(log),
            Err(err) => {
                tracing::error!("{err}");
                if let Err(cleanup) = sentinel::remove(&paths.in_progress_file) {
                    tracing::error!("{cleanup}");
                }
                Err(err)
            }
        }
    }

    /// `Ok(Err(reason))` for a blocked run.
    fn check_ready(&self) -> Result<Result<&Destination, BlockReason>, SyncError> {
        let paths = self.config.paths();

        let Some(destination) = self.config.destination() else {
            tracing::error!("Destination directory is not set in the config file");
            return Ok(Err(BlockReason::DestinationUnset));
        };

        if !paths.source.is_dir() {
            return Err(ConfigError::SourceDirectory {
                path: paths.source.clone(),
            }
            .into());
        }

        if sentinel::exists(&paths.in_progress_file) {
            tracing::info!("Existing transfer is still in progress, not starting a new one");
            return Ok(Err(BlockReason::InProgress));
        }

        if sentinel::exists(&paths.done_file) {
            tracing::debug!(path = %paths.done_file.display(), "transfer already completed");
            return Ok(Err(BlockReason::AlreadyDone));
        }

        if let Some(ready_file) = &paths.ready_file {
            if !sentinel::exists(ready_file) {
                tracing::info!(
                    "Transfer ready file: {} does not exist",
                    ready_file.display()
                );
                return Ok(Err(BlockReason::NotReady));
            }
        }

        Ok(Ok(destination))
    }

    fn transfer(
        &self,
        log: &mut RunLog,
        plan: &CommandPlan,
        destination: &Destination,
    ) -> Result<SyncOutcome, SyncError> {
        for warning in self.config.warnings() {
            log.warn(&warning.to_string());
        }

        // Step 1: dry run.
        log.debug("Checking for changes");
        log.info(DRY_RUN_START_MARKER);
        let report = ChangeDetector::new(&self.runner).detect(&plan.dry_run, destination);
        if let Ok(report) = &report {
            for line in &report.trace {
                log.info(line);
            }
        }
        log.info(DRY_RUN_END_MARKER);
        if !report?.transfer_required {
            log.info("No changes detected, not transferring");
            return Ok(SyncOutcome::SkippedNoOp);
        }

        let options = self.config.options();
        let flags = self.config.archive_flags();
        let paths = self.config.paths();
        let gate = NotificationGate::new(&options.notifications, &paths.source, &paths.log_file);

        // Step 2: start notification.
        self.notify(log, gate.start(), "start");

        // Step 3: destination directory.
        if !destination.exists(&self.runner) {
            if !options.create_dest {
                return Err(SyncError::DestinationDirectory {
                    path: destination.to_string(),
                });
            }
            log.info(&format!("Creating destination directory: {destination}"));
            destination.create(&self.runner, options.create_dest_parents, &mut |line| {
                log.debug(line)
            })?;
        }

        // Step 4: archive, transfer, extract, clean up at the destination.
        if let Some(archive) = &plan.archive {
            log.debug("Starting tar archiving");
            self.execute(log, archive)?;
        }
        log.debug("Starting rsync");
        self.execute(log, &plan.transfer)?;
        log.debug("Rsync completed");
        match &plan.extract {
            Some(extract) => {
                log.debug("Untaring files");
                self.execute(log, extract)?;
            }
            None => log.debug("Not untaring files"),
        }
        if let Some(delete) = &plan.delete_destination_archive {
            log.debug("Deleting tar archive at destination");
            self.execute(log, delete)?;
        }

        // Step 5: completion marker.
        if self.config.writes_done_file() {
            log.debug("Writing 'transfer.done' file");
            sentinel::touch(&paths.done_file)?;
        }

        // Step 6: source archive.
        if flags.tar && flags.delete_source_archive {
            log.debug(&format!("Deleting source archive: {}", paths.archive.display()));
            std::fs::remove_file(&paths.archive).map_err(|e| io_err(&paths.archive, e))?;
        }

        // Step 7: ownership and mode.
        for cmd in plan.chown.iter().chain(plan.chmod.iter()) {
            log.debug(&format!("Setting permissions: {cmd}"));
            self.execute(log, cmd)?;
        }

        // Step 8: end notification.
        self.notify(log, gate.end(), "end");

        Ok(SyncOutcome::Completed)
    }

    fn execute(&self, log: &mut RunLog, command: &CommandLine) -> Result<(), SyncError> {
        self.runner.run(command, &mut |line| log.debug(line))
    }

    /// Delivery problems are logged; they never change the run's outcome.
    fn notify(&self, log: &mut RunLog, notification: &Notification, which: &str) {
        if !notification.is_enabled() {
            return;
        }
        log.debug(&format!("Sending {which} notification"));
        if let Err(err) = notification.send(&self.runner, &mut |line| log.debug(line)) {
            log.warn(&format!("{which} notification failed: {err}"));
        }
    }

    fn write_header(
        &self,
        log: &mut RunLog,
        plan: &CommandPlan,
        destination: &Destination,
        started: DateTime<Local>,
    ) {
        let source = self.config.source().display();
        log.debug("************ TRANSFER LOG ************");
        log.info(&format!("Transferring directory: {source} to {destination}"));
        log.debug(&format!(
            "Transfer started: {}",
            started.format(LOG_TIMESTAMP_FORMAT)
        ));
        log.debug(&format!("Source directory: {source}"));
        log.debug(&format!("Destination directory: {destination}"));
        for (label, command) in plan.steps() {
            log.debug(&format!("{label} command: {command}"));
        }
        log.debug("**************************************");
        log.debug("Starting log");
    }
}

fn write_footer(log: &mut RunLog, started: DateTime<Local>) {
    let ended = Local::now();
    let elapsed = ended.signed_duration_since(started);
    log.info("Transfer ended");
    log.debug(&format!(
        "Transfer ended at: {}",
        ended.format(LOG_TIMESTAMP_FORMAT)
    ));
    log.debug(&format!(
        "Time taken: {:.3}s",
        elapsed.num_milliseconds() as f64 / 1000.0
    ));
}
