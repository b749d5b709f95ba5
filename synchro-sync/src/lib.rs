//! # synchro-sync
//!
//! Sentinel-gated, one-way directory synchronisation.
//!
//! [`SyncEngine`] decides whether a run may start, checks for changes with an
//! itemized dry run and, when something changed, drives the external archive,
//! transfer, extract, cleanup and permission commands of a [`CommandPlan`].
//! Call [`pipeline::run`] to load a configuration and run it in one step.

pub mod destination;
pub mod engine;
pub mod error;
pub mod exec;
pub mod itemize;
pub mod notify;
pub mod pipeline;
pub mod plan;
pub mod run_log;
pub mod sentinel;

pub use destination::DestinationOps;
pub use engine::{BlockReason, SyncEngine, SyncOutcome};
pub use error::SyncError;
pub use exec::{CommandLine, CommandRunner, SystemRunner};
pub use itemize::{ChangeDetector, ChangeReport};
pub use notify::{Notification, NotificationGate};
pub use pipeline::PipelineResult;
pub use plan::CommandPlan;
pub use run_log::RunLog;
