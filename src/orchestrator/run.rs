//! The batch run loop.

use super::progress::{GroupRecord, GroupStatus, ProgressState, Step, StepStatus};
use super::report::{BatchReport, FailureRecord, GroupOutcome};
use super::spool::BundleSpool;
use crate::checkpoint::CheckpointStore;
use crate::content::{ArtifactKind, ContentBundle, FailureStage, Group, Unit};
use crate::emission::{Emitter, SqlScriptWriter, WriteOutcome};
use crate::error::{PipelineError, StorageError};
use crate::generator::{ContentGenerator, UnitContext};
use crate::store::ContentRepository;
use crate::validator::Validator;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

const DEFAULT_GROUP_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Continue from the persisted Progress State.
    pub resume: bool,
    /// Reprocess groups whose content is already complete, and rerun finished steps.
    pub force: bool,
    pub validate_only: bool,
    /// Skip generation and import what is already spooled.
    pub import_only: bool,
    /// Also write each group's import as a SQL script here.
    pub export_dir: Option<PathBuf>,
}

pub struct BatchOrchestrator {
    store: Arc<dyn ContentRepository>,
    generator: Option<ContentGenerator>,
    checkpoint: Box<dyn CheckpointStore>,
    spool: BundleSpool,
    validator: Validator,
    group_delay: Duration,
}

/// How a group step ended, for the caller deciding whether to continue.
enum StepEnd {
    Continue,
    Stop,
}

impl BatchOrchestrator {
    pub fn new(
        store: Arc<dyn ContentRepository>,
        checkpoint: Box<dyn CheckpointStore>,
        spool: BundleSpool,
        validator: Validator,
    ) -> Self {
        Self {
            store,
            generator: None,
            checkpoint,
            spool,
            validator,
            group_delay: DEFAULT_GROUP_DELAY,
        }
    }

    pub fn with_generator(mut self, generator: ContentGenerator) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Pause between processed groups.
    pub fn with_group_delay(mut self, group_delay: Duration) -> Self {
        self.group_delay = group_delay;
        self
    }

    pub fn checkpoint(&self) -> &dyn CheckpointStore {
        self.checkpoint.as_ref()
    }

    pub async fn run(
        &self,
        groups: &[String],
        options: &RunOptions,
    ) -> Result<BatchReport, PipelineError> {
        if options.validate_only {
            return self.validate_groups(groups).await;
        }
        if !options.import_only && self.generator.is_none() {
            return Err(PipelineError::ConfigError(
                "a generation client is required unless running import-only or validate-only"
                    .to_string(),
            ));
        }

        let mut state = if options.resume {
            match self.checkpoint.load()? {
                Some(state) => {
                    info!(run_id = %state.run_id, groups = state.groups.len(), "resuming run");
                    state
                }
                None => {
                    info!("no checkpoint found, starting a fresh run");
                    ProgressState::new()
                }
            }
        } else {
            ProgressState::new()
        };

        let mut report = BatchReport::new(state.run_id);
        info!(run_id = %state.run_id, groups = groups.len(), "batch run started");

        let mut processed_previous = false;
        for slug in groups {
            if processed_previous && !self.group_delay.is_zero() {
                debug!(delay_ms = self.group_delay.as_millis() as u64, "pacing between groups");
                sleep(self.group_delay).await;
            }
            processed_previous = self
                .process_group(slug, &mut state, options, &mut report)
                .await?;
        }

        if !groups.is_empty() && state.all_settled(groups.iter().map(String::as_str)) {
            report.archived = self.checkpoint.archive()?;
        }

        info!(
            run_id = %state.run_id,
            completed = report.count(GroupStatus::Completed),
            skipped = report.count(GroupStatus::Skipped),
            failed = report.count(GroupStatus::Failed),
            failures = report.failures.len(),
            "batch run finished"
        );
        Ok(report)
    }

    /// Returns true when the group was actually worked on.
    async fn process_group(
        &self,
        slug: &str,
        state: &mut ProgressState,
        options: &RunOptions,
        report: &mut BatchReport,
    ) -> Result<bool, PipelineError> {
        match self.run_group(slug, state, options, report).await {
            Err(PipelineError::InvalidTransition(message)) => {
                warn!(group = %slug, error = %message, "checkpoint transition refused");
                self.fail_group(slug, FailureStage::Checkpoint, message, 0, state, report)?;
                Ok(true)
            }
            other => other,
        }
    }

    async fn run_group(
        &self,
        slug: &str,
        state: &mut ProgressState,
        options: &RunOptions,
        report: &mut BatchReport,
    ) -> Result<bool, PipelineError> {
        if options.resume && !options.force {
            if let Some(record) = state.group(slug) {
                if record.status.is_settled() {
                    info!(group = %slug, status = %record.status, "group already complete");
                    let mut outcome = GroupOutcome::from_record(record, 0, 0);
                    outcome.message = Some("already complete".to_string());
                    report.groups.push(outcome);
                    return Ok(false);
                }
            }
        }

        let (group, units) = match self.load_group(slug).await {
            Ok(loaded) => loaded,
            Err(message) => {
                warn!(group = %slug, error = %message, "group could not be loaded");
                state.ensure_group(slug).start();
                self.fail_group(slug, FailureStage::Catalog, message, 0, state, report)?;
                return Ok(true);
            }
        };

        let first_step = if options.import_only {
            Step::Import
        } else {
            Step::Generation
        };
        // Once one step runs, every later step runs again too.
        let (start, mut rerun) = if options.force {
            (first_step, true)
        } else {
            match state.ensure_group(slug).first_incomplete_step() {
                Some(Step::Generation) => (first_step, false),
                Some(step) => (step, false),
                // Every step is done but the group never settled.
                None => (first_step, true),
            }
        };

        if start == Step::Generation && !options.force {
            let complete = match self.is_complete(&units).await {
                Ok(complete) => complete,
                Err(err) => {
                    let message = format!("completeness check failed: {}", err);
                    warn!(group = %slug, error = %message, "group could not be checked");
                    state.ensure_group(slug).start();
                    self.fail_group(
                        slug,
                        FailureStage::Catalog,
                        message,
                        units.len(),
                        state,
                        report,
                    )?;
                    return Ok(true);
                }
            };
            if complete {
                self.skip_complete_group(slug, units.len(), state, report)?;
                return Ok(false);
            }
        }

        info!(group = %slug, units = units.len(), start = %start, "group started");
        state.ensure_group(slug).start();
        self.persist(state)?;

        if start == Step::Generation {
            match self
                .generation_step(slug, &group, &units, state, report, rerun)
                .await?
            {
                StepEnd::Continue => rerun = true,
                StepEnd::Stop => {
                    self.push_outcome(state, slug, units.len(), report);
                    return Ok(true);
                }
            }
        } else if options.import_only {
            let record = state.ensure_group(slug);
            if !record.generation.is_done() {
                record.generation.skip(Step::Generation, "import only")?;
            }
            rerun = true;
        }

        if start <= Step::Import {
            match self.import_step(slug, state, options, report, rerun).await? {
                StepEnd::Continue => rerun = true,
                StepEnd::Stop => {
                    self.push_outcome(state, slug, units.len(), report);
                    return Ok(true);
                }
            }
        }

        let record = state.ensure_group(slug);
        record.validation.begin(Step::Validation, rerun)?;
        self.persist(state)?;
        match self.validator.validate_group(self.store.as_ref(), slug).await {
            Ok(validation) => {
                let record = state.ensure_group(slug);
                if validation.is_valid() {
                    record
                        .validation
                        .finish(Step::Validation, StepStatus::Completed, None)?;
                    record.settle(GroupStatus::Completed, None);
                    state.counters.groups_completed += 1;
                    info!(group = %slug, "group completed");
                } else {
                    let issues = validation.issue_count();
                    let message = format!("{} validation issues", issues);
                    record.validation.finish(
                        Step::Validation,
                        StepStatus::CompletedWithIssues,
                        Some(message.clone()),
                    )?;
                    record.settle(GroupStatus::Failed, Some(message.clone()));
                    state.counters.groups_failed += 1;
                    warn!(group = %slug, issues, "group failed validation");
                    report
                        .failures
                        .push(group_failure(slug, FailureStage::Validation, message));
                }
                report.validations.push(validation);
            }
            Err(err) => {
                let message = err.to_string();
                let record = state.ensure_group(slug);
                record
                    .validation
                    .finish(Step::Validation, StepStatus::Failed, Some(message.clone()))?;
                record.settle(GroupStatus::Failed, Some(message.clone()));
                state.counters.groups_failed += 1;
                report
                    .failures
                    .push(group_failure(slug, FailureStage::Validation, message));
            }
        }
        self.persist(state)?;
        self.push_outcome(state, slug, units.len(), report);
        Ok(true)
    }

    async fn generation_step(
        &self,
        slug: &str,
        group: &Group,
        units: &[Unit],
        state: &mut ProgressState,
        report: &mut BatchReport,
        rerun: bool,
    ) -> Result<StepEnd, PipelineError> {
        let generator = self.generator.as_ref().ok_or_else(|| {
            PipelineError::ConfigError("no generation client configured".to_string())
        })?;
        state
            .ensure_group(slug)
            .generation
            .begin(Step::Generation, rerun)?;
        self.persist(state)?;

        let mut bundles = Vec::with_capacity(units.len());
        let mut terminal = None;
        for unit in units {
            let context = UnitContext::new(unit.clone(), group.name.clone());
            let mut bundle = ContentBundle::new(context.key());
            let result = generator.generate_into(&context, &mut bundle).await;
            tally_generation(slug, &bundle, state, report);
            bundles.push(bundle);
            if let Err(err) = result {
                terminal = Some(err);
                break;
            }
        }

        if let Some(err) = terminal {
            let message = err.to_string();
            warn!(group = %slug, error = %message, "generation aborted");
            self.fail_step(slug, Step::Generation, message, state)?;
            return Ok(StepEnd::Stop);
        }

        if let Err(err) = self.spool.write(slug, &bundles) {
            let message = err.to_string();
            report
                .failures
                .push(group_failure(slug, FailureStage::Spool, message.clone()));
            self.fail_step(slug, Step::Generation, message, state)?;
            return Ok(StepEnd::Stop);
        }

        let failed_kinds: usize = bundles.iter().map(|b| b.failures().len()).sum();
        let (status, message) = if failed_kinds == 0 {
            (StepStatus::Completed, None)
        } else {
            (
                StepStatus::CompletedWithIssues,
                Some(format!("{} artifacts failed", failed_kinds)),
            )
        };
        state
            .ensure_group(slug)
            .generation
            .finish(Step::Generation, status, message)?;
        self.persist(state)?;
        Ok(StepEnd::Continue)
    }

    async fn import_step(
        &self,
        slug: &str,
        state: &mut ProgressState,
        options: &RunOptions,
        report: &mut BatchReport,
        rerun: bool,
    ) -> Result<StepEnd, PipelineError> {
        state.ensure_group(slug).import.begin(Step::Import, rerun)?;
        self.persist(state)?;

        let bundles = match self.spool.read(slug) {
            Ok(bundles) => bundles,
            Err(err) => {
                let message = err.to_string();
                warn!(group = %slug, error = %message, "spool unavailable");
                report
                    .failures
                    .push(group_failure(slug, FailureStage::Spool, message.clone()));
                self.fail_step(slug, Step::Import, message, state)?;
                return Ok(StepEnd::Stop);
            }
        };

        let emission = Emitter::emit_group(self.store.as_ref(), slug, &bundles).await;
        let mut write_failures = 0;
        for unit in &emission.units {
            for write in &unit.writes {
                match &write.outcome {
                    WriteOutcome::Written { .. } => {
                        report.writes.record_success(write.kind);
                        state.counters.writes_succeeded += 1;
                    }
                    WriteOutcome::Failed { message } => {
                        write_failures += 1;
                        report.writes.record_failure(write.kind);
                        state.counters.writes_failed += 1;
                        report.failures.push(FailureRecord {
                            group: slug.to_string(),
                            unit: Some(unit.unit.unit.clone()),
                            kind: Some(write.kind),
                            stage: FailureStage::Write,
                            message: message.clone(),
                        });
                    }
                    WriteOutcome::Skipped => {}
                }
            }
        }

        if let Some(dir) = &options.export_dir {
            let writer = SqlScriptWriter::new(slug);
            let rendered = Emitter::emit_group(&writer, slug, &bundles).await;
            let written = if rendered.has_failures() {
                Err("could not render every artifact".to_string())
            } else {
                writer.write_to(dir).map_err(|e| e.to_string())
            };
            match written {
                Ok(path) => report.exports.push(path),
                Err(message) => {
                    write_failures += 1;
                    report.failures.push(group_failure(
                        slug,
                        FailureStage::Write,
                        format!("export failed: {}", message),
                    ));
                }
            }
        }

        let (status, message) = if write_failures == 0 {
            if let Err(err) = self.spool.remove(slug) {
                warn!(group = %slug, error = %err, "imported spool could not be removed");
            }
            (StepStatus::Completed, None)
        } else {
            (
                StepStatus::CompletedWithIssues,
                Some(format!("{} writes failed", write_failures)),
            )
        };
        state
            .ensure_group(slug)
            .import
            .finish(Step::Import, status, message)?;
        self.persist(state)?;
        Ok(StepEnd::Continue)
    }

    async fn validate_groups(&self, groups: &[String]) -> Result<BatchReport, PipelineError> {
        let mut report = BatchReport::new(Uuid::new_v4());
        for slug in groups {
            let mut record = GroupRecord::new(slug.as_str());
            record.generation.status = StepStatus::Skipped;
            record.import.status = StepStatus::Skipped;
            let (units, issues) = match self
                .validator
                .validate_group(self.store.as_ref(), slug)
                .await
            {
                Ok(validation) => {
                    let issues = validation.issue_count();
                    if validation.is_valid() {
                        record.validation.status = StepStatus::Completed;
                        record.status = GroupStatus::Completed;
                    } else {
                        let message = format!("{} validation issues", issues);
                        record.validation.status = StepStatus::CompletedWithIssues;
                        record.status = GroupStatus::Failed;
                        record.last_error = Some(message.clone());
                        report
                            .failures
                            .push(group_failure(slug, FailureStage::Validation, message));
                    }
                    let units = validation.units.len();
                    report.validations.push(validation);
                    (units, issues)
                }
                Err(err) => {
                    let message = err.to_string();
                    record.validation.status = StepStatus::Failed;
                    record.status = GroupStatus::Failed;
                    record.last_error = Some(message.clone());
                    report
                        .failures
                        .push(group_failure(slug, FailureStage::Validation, message));
                    (0, 0)
                }
            };
            report
                .groups
                .push(GroupOutcome::from_record(&record, units, issues));
        }
        Ok(report)
    }

    async fn load_group(&self, slug: &str) -> Result<(Group, Vec<Unit>), String> {
        let group = match self.store.get_group(slug).await {
            Ok(Some(group)) => group,
            Ok(None) => return Err(format!("unknown group {}", slug)),
            Err(err) => return Err(err.to_string()),
        };
        let units = self
            .store
            .list_units(slug)
            .await
            .map_err(|e| e.to_string())?;
        Ok((group, units))
    }

    /// Every unit has every kind at or above target. An empty group is never complete.
    async fn is_complete(&self, units: &[Unit]) -> Result<bool, StorageError> {
        if units.is_empty() {
            return Ok(false);
        }
        for unit in units {
            let counts = self.store.content_counts(&unit.key()).await?;
            if !self.validator.thresholds().is_satisfied_by(&counts) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn skip_complete_group(
        &self,
        slug: &str,
        units: usize,
        state: &mut ProgressState,
        report: &mut BatchReport,
    ) -> Result<(), PipelineError> {
        info!(group = %slug, units, "content already complete, skipping");
        let record = state.ensure_group(slug);
        for step in Step::ALL {
            if !record.step(step).is_done() {
                record.step_mut(step).skip(step, "content already complete")?;
            }
        }
        record.settle(GroupStatus::Skipped, None);
        state.counters.groups_skipped += 1;
        self.persist(state)?;
        self.push_outcome(state, slug, units, report);
        Ok(())
    }

    /// Settle the group as failed with a group-level failure record.
    fn fail_group(
        &self,
        slug: &str,
        stage: FailureStage,
        message: String,
        units: usize,
        state: &mut ProgressState,
        report: &mut BatchReport,
    ) -> Result<(), PipelineError> {
        state
            .ensure_group(slug)
            .settle(GroupStatus::Failed, Some(message.clone()));
        state.counters.groups_failed += 1;
        self.persist(state)?;
        report.failures.push(group_failure(slug, stage, message));
        self.push_outcome(state, slug, units, report);
        Ok(())
    }

    fn fail_step(
        &self,
        slug: &str,
        step: Step,
        message: String,
        state: &mut ProgressState,
    ) -> Result<(), PipelineError> {
        let record = state.ensure_group(slug);
        record
            .step_mut(step)
            .finish(step, StepStatus::Failed, Some(message.clone()))?;
        record.settle(GroupStatus::Failed, Some(message));
        state.counters.groups_failed += 1;
        self.persist(state)
    }

    fn persist(&self, state: &mut ProgressState) -> Result<(), PipelineError> {
        state.touch();
        self.checkpoint.save(state)?;
        Ok(())
    }

    fn push_outcome(
        &self,
        state: &mut ProgressState,
        slug: &str,
        units: usize,
        report: &mut BatchReport,
    ) {
        let issues = report
            .validations
            .iter()
            .rev()
            .find(|v| v.group == slug)
            .map_or(0, |v| v.issue_count());
        let record = state.ensure_group(slug);
        report
            .groups
            .push(GroupOutcome::from_record(record, units, issues));
    }
}

fn tally_generation(
    slug: &str,
    bundle: &ContentBundle,
    state: &mut ProgressState,
    report: &mut BatchReport,
) {
    for kind in ArtifactKind::ALL {
        if bundle.is_generated(kind) {
            report.generation.record_success(kind);
            state.counters.artifacts_generated += 1;
        } else if let Some(failure) = bundle.failure(kind) {
            report.generation.record_failure(kind);
            state.counters.artifacts_failed += 1;
            report.failures.push(FailureRecord {
                group: slug.to_string(),
                unit: Some(bundle.unit.unit.clone()),
                kind: Some(kind),
                stage: failure.stage,
                message: failure.message.clone(),
            });
        }
    }
}

fn group_failure(slug: &str, stage: FailureStage, message: String) -> FailureRecord {
    FailureRecord {
        group: slug.to_string(),
        unit: None,
        kind: None,
        stage,
        message,
    }
}
