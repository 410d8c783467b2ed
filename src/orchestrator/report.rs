//! Batch run report.

use super::progress::{GroupRecord, GroupStatus, StepStatus};
use crate::content::{ArtifactKind, FailureStage};
use crate::validator::GroupValidation;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub attempted: u32,
    pub succeeded: u32,
    pub failed: u32,
}

impl Tally {
    fn add(&mut self, other: Tally) {
        self.attempted += other.attempted;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
    }
}

/// Attempted/succeeded/failed per artifact kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct KindCounters {
    by_kind: BTreeMap<ArtifactKind, Tally>,
}

impl KindCounters {
    pub fn record_success(&mut self, kind: ArtifactKind) {
        let tally = self.by_kind.entry(kind).or_default();
        tally.attempted += 1;
        tally.succeeded += 1;
    }

    pub fn record_failure(&mut self, kind: ArtifactKind) {
        let tally = self.by_kind.entry(kind).or_default();
        tally.attempted += 1;
        tally.failed += 1;
    }

    pub fn get(&self, kind: ArtifactKind) -> Tally {
        self.by_kind.get(&kind).copied().unwrap_or_default()
    }

    pub fn total(&self) -> Tally {
        let mut total = Tally::default();
        for tally in self.by_kind.values() {
            total.add(*tally);
        }
        total
    }
}

/// One failure anywhere in the run. Group-level failures carry no unit or kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub group: String,
    pub unit: Option<String>,
    pub kind: Option<ArtifactKind>,
    pub stage: FailureStage,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepStatuses {
    pub generation: StepStatus,
    pub import: StepStatus,
    pub validation: StepStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupOutcome {
    pub group: String,
    pub status: GroupStatus,
    pub steps: StepStatuses,
    pub units: usize,
    pub issues: usize,
    pub message: Option<String>,
}

impl GroupOutcome {
    pub fn from_record(record: &GroupRecord, units: usize, issues: usize) -> Self {
        Self {
            group: record.slug.clone(),
            status: record.status,
            steps: StepStatuses {
                generation: record.generation.status,
                import: record.import.status,
                validation: record.validation.status,
            },
            units,
            issues,
            message: record.last_error.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub groups: Vec<GroupOutcome>,
    pub generation: KindCounters,
    pub writes: KindCounters,
    pub failures: Vec<FailureRecord>,
    pub validations: Vec<GroupValidation>,
    pub exports: Vec<PathBuf>,
    pub archived: Option<PathBuf>,
}

impl BatchReport {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            groups: Vec::new(),
            generation: KindCounters::default(),
            writes: KindCounters::default(),
            failures: Vec::new(),
            validations: Vec::new(),
            exports: Vec::new(),
            archived: None,
        }
    }

    pub fn group(&self, slug: &str) -> Option<&GroupOutcome> {
        self.groups.iter().find(|g| g.group == slug)
    }

    pub fn count(&self, status: GroupStatus) -> usize {
        self.groups.iter().filter(|g| g.status == status).count()
    }

    /// Any failed group or invalid validation.
    pub fn has_unresolved_failures(&self) -> bool {
        self.groups.iter().any(|g| g.status == GroupStatus::Failed)
            || self.validations.iter().any(|v| !v.is_valid())
    }
}
