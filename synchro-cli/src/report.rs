//! Human and JSON rendering of a finished run.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;

use synchro_core::ArchiveFlags;
use synchro_sync::{PipelineResult, SyncOutcome};

#[derive(Serialize)]
struct RunReport<'a> {
    source: &'a Path,
    destination: Option<String>,
    log_file: &'a Path,
    archive: ArchiveFlags,
    cron: bool,
    outcome: SyncOutcome,
    transferred: bool,
}

impl<'a> RunReport<'a> {
    fn new(result: &'a PipelineResult) -> Self {
        let config = &result.config;
        Self {
            source: config.source(),
            destination: config.destination().map(ToString::to_string),
            log_file: &config.paths().log_file,
            archive: config.archive_flags(),
            cron: config.run_settings().cron,
            outcome: result.outcome,
            transferred: result.outcome.transferred(),
        }
    }
}

pub fn print_json(result: &PipelineResult) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(&RunReport::new(result))
            .context("failed to serialize run report")?
    );
    Ok(())
}

pub fn print_summary(result: &PipelineResult) {
    let config = &result.config;
    let source = config.source().display();
    let destination = config
        .destination()
        .map(ToString::to_string)
        .unwrap_or_else(|| "<unset>".to_owned());

    match result.outcome {
        SyncOutcome::Completed => println!(
            "{} {source} → {destination} (log: {})",
            "✓ transferred".green().bold(),
            config.paths().log_file.display()
        ),
        SyncOutcome::SkippedNoOp => println!(
            "{} {source} and {destination} already match",
            "· no changes".cyan()
        ),
        SyncOutcome::Blocked(reason) => {
            println!("{} {source}: {reason}", "- not running".yellow())
        }
    }
}
