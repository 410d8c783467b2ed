//! Idempotent Emission
//!
//! Writes generated bundles through a `ContentSink`. Notes are upserted by unit; every
//! ordered collection is replaced whole, so emitting the same bundle twice leaves the
//! datastore exactly as emitting it once. Kinds that failed generation are skipped and
//! their existing rows stay untouched. A failed write is recorded for that kind only.

use crate::content::{ArtifactKind, ContentBundle, Slot, UnitKey};
use crate::error::StorageError;
use crate::store::ContentSink;
use serde::Serialize;
use tracing::{debug, warn};

pub mod export;

pub use export::{export_group, SqlScriptWriter};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WriteOutcome {
    Written { items: usize },
    /// Slot was not generated; nothing written.
    Skipped,
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindWrite {
    pub kind: ArtifactKind,
    pub outcome: WriteOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitEmission {
    pub unit: UnitKey,
    pub writes: Vec<KindWrite>,
}

impl UnitEmission {
    pub fn failures(&self) -> impl Iterator<Item = (ArtifactKind, &str)> {
        self.writes.iter().filter_map(|w| match &w.outcome {
            WriteOutcome::Failed { message } => Some((w.kind, message.as_str())),
            _ => None,
        })
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupEmission {
    pub group: String,
    pub units: Vec<UnitEmission>,
}

impl GroupEmission {
    pub fn has_failures(&self) -> bool {
        self.units.iter().any(UnitEmission::has_failures)
    }
}

pub struct Emitter;

impl Emitter {
    pub async fn emit_unit<S: ContentSink + ?Sized>(sink: &S, bundle: &ContentBundle) -> UnitEmission {
        let key = &bundle.unit;
        let mut writes = Vec::with_capacity(ArtifactKind::ALL.len());

        for kind in ArtifactKind::ALL {
            let result = match kind {
                ArtifactKind::Notes => match &bundle.notes {
                    Slot::Generated(notes) => Some(sink.upsert_notes(key, notes).await.map(|_| 1)),
                    _ => None,
                },
                ArtifactKind::Flashcards => write_collection(&bundle.flashcards, |items| {
                    sink.replace_flashcards(key, items)
                })
                .await,
                ArtifactKind::Quiz => write_collection(&bundle.quiz, |items| {
                    sink.replace_quiz_questions(key, items)
                })
                .await,
                ArtifactKind::Practice => write_collection(&bundle.practice, |items| {
                    sink.replace_practice_questions(key, items)
                })
                .await,
                ArtifactKind::Recall => write_collection(&bundle.recall, |items| {
                    sink.replace_recall_prompts(key, items)
                })
                .await,
            };

            let outcome = match result {
                None => WriteOutcome::Skipped,
                Some(Ok(items)) => {
                    debug!(unit = %key, kind = %kind, items, "artifact written");
                    WriteOutcome::Written { items }
                }
                Some(Err(err)) => {
                    warn!(unit = %key, kind = %kind, error = %err, "artifact write failed");
                    WriteOutcome::Failed {
                        message: err.to_string(),
                    }
                }
            };
            writes.push(KindWrite { kind, outcome });
        }

        UnitEmission {
            unit: key.clone(),
            writes,
        }
    }

    pub async fn emit_group<S: ContentSink + ?Sized>(
        sink: &S,
        group: &str,
        bundles: &[ContentBundle],
    ) -> GroupEmission {
        let mut units = Vec::with_capacity(bundles.len());
        for bundle in bundles {
            units.push(Self::emit_unit(sink, bundle).await);
        }
        GroupEmission {
            group: group.to_string(),
            units,
        }
    }
}

async fn write_collection<'a, T, F, Fut>(
    slot: &'a Slot<Vec<T>>,
    write: F,
) -> Option<Result<usize, StorageError>>
where
    F: FnOnce(&'a [T]) -> Fut,
    Fut: std::future::Future<Output = Result<(), StorageError>>,
{
    match slot {
        Slot::Generated(items) => Some(write(items).await.map(|_| items.len())),
        _ => None,
    }
}
