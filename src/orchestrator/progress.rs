//! Progress State: the persisted record of a batch run.
//!
//! One checkpoint record per group, each with a step record for generation, import and
//! validation. Step statuses only move forward; a step may be attempted again when it
//! failed, finished with issues, or was interrupted mid-flight, and otherwise only when the
//! caller explicitly allows a rerun.

use crate::error::PipelineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub const PROGRESS_STATE_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Skipped,
}

impl GroupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupStatus::Pending => "pending",
            GroupStatus::InProgress => "in_progress",
            GroupStatus::Completed => "completed",
            GroupStatus::Failed => "failed",
            GroupStatus::Skipped => "skipped",
        }
    }

    /// Completed or skipped: nothing left to do.
    pub fn is_settled(&self) -> bool {
        matches!(self, GroupStatus::Completed | GroupStatus::Skipped)
    }
}

impl fmt::Display for GroupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    CompletedWithIssues,
    Failed,
    Skipped,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::InProgress => "in_progress",
            StepStatus::Completed => "completed",
            StepStatus::CompletedWithIssues => "completed_with_issues",
            StepStatus::Failed => "failed",
            StepStatus::Skipped => "skipped",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            StepStatus::Completed
                | StepStatus::CompletedWithIssues
                | StepStatus::Failed
                | StepStatus::Skipped
        )
    }

    /// A step in one of these states is retried on resume without forcing.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StepStatus::Pending
                | StepStatus::InProgress
                | StepStatus::Failed
                | StepStatus::CompletedWithIssues
        )
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Generation,
    Import,
    Validation,
}

impl Step {
    pub const ALL: [Step; 3] = [Step::Generation, Step::Import, Step::Validation];

    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Generation => "generation",
            Step::Import => "import",
            Step::Validation => "validation",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub status: StepStatus,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Default for StepRecord {
    fn default() -> Self {
        Self {
            status: StepStatus::Pending,
            attempts: 0,
            updated_at: None,
            message: None,
        }
    }
}

impl StepRecord {
    /// Start an attempt. Completed or skipped steps need `allow_rerun`.
    pub fn begin(&mut self, step: Step, allow_rerun: bool) -> Result<(), PipelineError> {
        if !self.status.is_retryable() && !allow_rerun {
            return Err(PipelineError::InvalidTransition(format!(
                "{} step is {} and cannot be restarted without force",
                step, self.status
            )));
        }
        self.status = StepStatus::InProgress;
        self.attempts += 1;
        self.message = None;
        self.updated_at = Some(Utc::now());
        Ok(())
    }

    /// End the current attempt with a finished status.
    pub fn finish(
        &mut self,
        step: Step,
        status: StepStatus,
        message: Option<String>,
    ) -> Result<(), PipelineError> {
        if self.status != StepStatus::InProgress {
            return Err(PipelineError::InvalidTransition(format!(
                "{} step is {}, not in progress",
                step, self.status
            )));
        }
        if !status.is_finished() {
            return Err(PipelineError::InvalidTransition(format!(
                "{} is not a finished status for the {} step",
                status, step
            )));
        }
        self.status = status;
        self.message = message;
        self.updated_at = Some(Utc::now());
        Ok(())
    }

    /// Mark a step as intentionally not run.
    pub fn skip(&mut self, step: Step, message: impl Into<String>) -> Result<(), PipelineError> {
        if self.status == StepStatus::Completed {
            return Err(PipelineError::InvalidTransition(format!(
                "{} step is already completed",
                step
            )));
        }
        self.status = StepStatus::Skipped;
        self.message = Some(message.into());
        self.updated_at = Some(Utc::now());
        Ok(())
    }

    pub fn is_done(&self) -> bool {
        matches!(self.status, StepStatus::Completed | StepStatus::Skipped)
    }
}

/// Checkpoint record for one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub slug: String,
    pub status: GroupStatus,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_error: Option<String>,
    #[serde(default)]
    pub generation: StepRecord,
    #[serde(default)]
    pub import: StepRecord,
    #[serde(default)]
    pub validation: StepRecord,
}

impl GroupRecord {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            status: GroupStatus::Pending,
            started_at: None,
            completed_at: None,
            last_error: None,
            generation: StepRecord::default(),
            import: StepRecord::default(),
            validation: StepRecord::default(),
        }
    }

    pub fn step(&self, step: Step) -> &StepRecord {
        match step {
            Step::Generation => &self.generation,
            Step::Import => &self.import,
            Step::Validation => &self.validation,
        }
    }

    pub fn step_mut(&mut self, step: Step) -> &mut StepRecord {
        match step {
            Step::Generation => &mut self.generation,
            Step::Import => &mut self.import,
            Step::Validation => &mut self.validation,
        }
    }

    /// Where a resumed run picks up.
    pub fn first_incomplete_step(&self) -> Option<Step> {
        Step::ALL.into_iter().find(|s| !self.step(*s).is_done())
    }

    pub fn start(&mut self) {
        self.status = GroupStatus::InProgress;
        self.started_at = Some(Utc::now());
        self.completed_at = None;
        self.last_error = None;
    }

    pub fn settle(&mut self, status: GroupStatus, last_error: Option<String>) {
        self.status = status;
        self.last_error = last_error;
        self.completed_at = Some(Utc::now());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressCounters {
    pub groups_completed: u32,
    pub groups_failed: u32,
    pub groups_skipped: u32,
    pub artifacts_generated: u32,
    pub artifacts_failed: u32,
    pub writes_succeeded: u32,
    pub writes_failed: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    pub version: u32,
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub counters: ProgressCounters,
    /// Insertion-ordered; slugs are unique.
    #[serde(default)]
    pub groups: Vec<GroupRecord>,
}

impl ProgressState {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            version: PROGRESS_STATE_VERSION,
            run_id: Uuid::new_v4(),
            started_at: now,
            updated_at: now,
            counters: ProgressCounters::default(),
            groups: Vec::new(),
        }
    }

    pub fn group(&self, slug: &str) -> Option<&GroupRecord> {
        self.groups.iter().find(|g| g.slug == slug)
    }

    /// The group's record, appended as pending if absent.
    pub fn ensure_group(&mut self, slug: &str) -> &mut GroupRecord {
        match self.groups.iter().position(|g| g.slug == slug) {
            Some(index) => &mut self.groups[index],
            None => {
                self.groups.push(GroupRecord::new(slug));
                let last = self.groups.len() - 1;
                &mut self.groups[last]
            }
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// True when every listed group is completed or skipped.
    pub fn all_settled<'a>(&self, slugs: impl IntoIterator<Item = &'a str>) -> bool {
        slugs
            .into_iter()
            .all(|slug| self.group(slug).map_or(false, |g| g.status.is_settled()))
    }
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::new()
    }
}
