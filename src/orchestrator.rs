//! Checkpointed Batch Orchestrator
//!
//! Drives groups through generation, import and validation. Every step transition is
//! persisted through a `CheckpointStore`, generated bundles are staged in a `BundleSpool`
//! between generation and import, and one group's failure never halts the batch.

pub mod progress;
pub mod report;
pub mod run;
pub mod spool;

pub use progress::{
    GroupRecord, GroupStatus, ProgressCounters, ProgressState, Step, StepRecord, StepStatus,
};
pub use report::{BatchReport, FailureRecord, GroupOutcome, KindCounters, StepStatuses, Tally};
pub use run::{BatchOrchestrator, RunOptions};
pub use spool::BundleSpool;
