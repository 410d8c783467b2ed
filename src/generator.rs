//! Entity Content Generator
//!
//! Produces the content bundle for one unit: for each artifact kind in fixed order it
//! builds a prompt, calls the generation client through the retry policy, paces, recovers
//! structured output, and shape-checks it. Per-kind failures are recorded in the bundle
//! and generation moves on; only retry exhaustion aborts the unit.

use crate::content::schema::parse_artifact;
use crate::content::{
    Artifact, ArtifactFailure, ArtifactKind, ContentBundle, FailureStage, QualityThresholds, Unit,
    UnitKey,
};
use crate::error::PipelineError;
use crate::prompt::PromptBuilder;
use crate::provider::GenerationClient;
use crate::recovery::recover_json;
use crate::retry::{RetryError, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

const DEFAULT_CALL_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 8192;

/// What the generator needs to know about a unit.
#[derive(Debug, Clone)]
pub struct UnitContext {
    pub unit: Unit,
    pub group_name: String,
}

impl UnitContext {
    pub fn new(unit: Unit, group_name: impl Into<String>) -> Self {
        Self {
            unit,
            group_name: group_name.into(),
        }
    }

    pub fn key(&self) -> UnitKey {
        self.unit.key()
    }
}

enum KindFailure {
    /// Ends the unit (and the group).
    Terminal(PipelineError),
    /// Recorded on the kind's slot; generation continues.
    Contained(ArtifactFailure),
}

fn contained(stage: FailureStage, err: impl std::fmt::Display) -> KindFailure {
    KindFailure::Contained(ArtifactFailure {
        stage,
        message: err.to_string(),
    })
}

pub struct ContentGenerator {
    client: Arc<dyn GenerationClient>,
    retry: RetryPolicy,
    call_delay: Duration,
    thresholds: QualityThresholds,
    prompts: PromptBuilder,
}

impl ContentGenerator {
    pub fn new(client: Arc<dyn GenerationClient>, thresholds: QualityThresholds) -> Self {
        let prompts = PromptBuilder::new(thresholds.clone(), DEFAULT_MAX_OUTPUT_TOKENS, None);
        Self {
            client,
            retry: RetryPolicy::default(),
            call_delay: DEFAULT_CALL_DELAY,
            thresholds,
            prompts,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Pause after every successful call.
    pub fn with_call_delay(mut self, call_delay: Duration) -> Self {
        self.call_delay = call_delay;
        self
    }

    pub fn with_output_limits(mut self, max_output_tokens: u32, temperature: Option<f32>) -> Self {
        self.prompts = PromptBuilder::new(self.thresholds.clone(), max_output_tokens, temperature);
        self
    }

    pub fn thresholds(&self) -> &QualityThresholds {
        &self.thresholds
    }

    pub fn client(&self) -> &Arc<dyn GenerationClient> {
        &self.client
    }

    /// Generate a fresh bundle for `unit`.
    pub async fn generate_unit(&self, unit: &UnitContext) -> Result<ContentBundle, PipelineError> {
        let mut bundle = ContentBundle::new(unit.key());
        self.generate_into(unit, &mut bundle).await?;
        Ok(bundle)
    }

    /// Fill `bundle` kind by kind. On a terminal error the bundle keeps what was produced
    /// so far, the failing kind is marked terminal, and later kinds stay missing.
    pub async fn generate_into(
        &self,
        unit: &UnitContext,
        bundle: &mut ContentBundle,
    ) -> Result<(), PipelineError> {
        let key = unit.key();
        for kind in ArtifactKind::ALL {
            match self.generate_kind(kind, unit).await {
                Ok(artifact) => {
                    info!(
                        unit = %key,
                        kind = %kind,
                        items = artifact.item_count(),
                        "artifact generated"
                    );
                    bundle.set(artifact);
                }
                Err(KindFailure::Contained(failure)) => {
                    warn!(
                        unit = %key,
                        kind = %kind,
                        stage = %failure.stage,
                        error = %failure.message,
                        "artifact generation failed"
                    );
                    bundle.fail(kind, failure);
                }
                Err(KindFailure::Terminal(err)) => {
                    bundle.fail(
                        kind,
                        ArtifactFailure {
                            stage: FailureStage::Terminal,
                            message: err.to_string(),
                        },
                    );
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    async fn generate_kind(
        &self,
        kind: ArtifactKind,
        unit: &UnitContext,
    ) -> Result<Artifact, KindFailure> {
        let request = self.prompts.request(kind, unit);
        let operation = format!("generate {} for {}", kind, unit.key());
        let client = &self.client;

        let raw = match self
            .retry
            .invoke(&operation, || client.generate(&request))
            .await
        {
            Ok(raw) => raw,
            Err(RetryError::Rejected(err)) => return Err(contained(FailureStage::Provider, err)),
            Err(RetryError::Exhausted { attempts, last }) => {
                return Err(KindFailure::Terminal(PipelineError::Terminal {
                    operation,
                    attempts,
                    source: last,
                }))
            }
        };

        if !self.call_delay.is_zero() {
            sleep(self.call_delay).await;
        }

        let recovered = recover_json(&raw).map_err(|e| contained(FailureStage::Recovery, e))?;
        debug!(kind = %kind, strategy = %recovered.strategy, "output recovered");
        parse_artifact(kind, recovered.value, &self.thresholds)
            .map_err(|e| contained(FailureStage::Schema, e))
    }
}
