//! Synchro — sentinel-gated one-way directory synchronisation.
//!
//! # Usage
//!
//! ```text
//! synchro [<config-file | source-dir>] [-l <log-file>] [--no-permission-change] [--cron]
//!         [--keep-source-archive] [--keep-destination-archive] [--json]
//! ```
//!
//! Without a path, `synchro.conf` in the current directory is used.

mod report;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use synchro_core::{Invocation, OptionOverrides, RunSettings, DEFAULT_CONFIG_FILE};
use synchro_sync::pipeline;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "synchro",
    version,
    about = "Synchronise a directory to a local or remote destination",
    long_about = None,
)]
struct Cli {
    /// Config file, or a source directory holding `synchro.conf`.
    #[arg(default_value = DEFAULT_CONFIG_FILE)]
    path: PathBuf,

    /// Write the run log here instead of `<source>/synchro_<timestamp>.log`.
    #[arg(short = 'l', long)]
    log_file: Option<PathBuf>,

    /// Do not chown or chmod the destination after the transfer.
    #[arg(long)]
    no_permission_change: bool,

    /// Never write `transfer.done`, and keep every synchro log out of the transfer.
    #[arg(long)]
    cron: bool,

    /// Leave `<source>.tar` next to the source directory.
    #[arg(long)]
    keep_source_archive: bool,

    /// Leave the archive in the destination after extracting it.
    #[arg(long)]
    keep_destination_archive: bool,

    /// Print the run report as JSON.
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn invocation(&self) -> Invocation {
        let path = std::fs::canonicalize(&self.path).unwrap_or_else(|_| self.path.clone());
        let (config_file, source) = if path.is_dir() {
            (path.join(DEFAULT_CONFIG_FILE), Some(path))
        } else {
            (path, None)
        };
        Invocation {
            config_file,
            source,
            log_file: self.log_file.clone(),
            overrides: OptionOverrides {
                delete_source_archive: self.keep_source_archive.then_some(false),
                delete_destination_archive: self.keep_destination_archive.then_some(false),
                ..OptionOverrides::default()
            },
            run: RunSettings {
                change_permissions: !self.no_permission_change,
                cron: self.cron,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let invocation = cli.invocation();
    let result = pipeline::run(&invocation)
        .with_context(|| format!("synchronisation failed for {}", display(&cli.path)))?;

    if cli.json {
        report::print_json(&result)
    } else {
        report::print_summary(&result);
        Ok(())
    }
}

/// Console narration on stderr; stdout carries only the report.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn display(path: &Path) -> String {
    path.display().to_string()
}
