//! Shared test utilities for integration tests
//!
//! A scripted generation client that answers every prompt with content meeting the
//! default thresholds, catalog fixtures over an in-memory store, and an orchestrator
//! wired to temporary checkpoint and spool locations.

use async_trait::async_trait;
use coursegen::checkpoint::FileCheckpointStore;
use coursegen::content::schema::parse_artifact;
use coursegen::content::{ArtifactKind, ContentBundle, Group, QualityThresholds, Unit, UnitKey};
use coursegen::emission::Emitter;
use coursegen::error::ProviderError;
use coursegen::generator::ContentGenerator;
use coursegen::orchestrator::{BatchOrchestrator, BundleSpool};
use coursegen::provider::{GenerationClient, GenerationRequest};
use coursegen::retry::RetryPolicy;
use coursegen::store::{CatalogWriter, SqliteContentStore};
use coursegen::validator::Validator;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Which artifact a prompt asks for, read from its instruction line.
pub fn kind_of(prompt: &str) -> ArtifactKind {
    if prompt.contains("Write revision notes") {
        ArtifactKind::Notes
    } else if prompt.contains("flashcards:") {
        ArtifactKind::Flashcards
    } else if prompt.contains("quiz questions") {
        ArtifactKind::Quiz
    } else if prompt.contains("exam-style practice questions") {
        ArtifactKind::Practice
    } else if prompt.contains("active-recall prompts") {
        ArtifactKind::Recall
    } else {
        panic!("unrecognised prompt: {}", prompt)
    }
}

pub fn topic_of(prompt: &str) -> String {
    prompt
        .lines()
        .find_map(|line| line.strip_prefix("Topic: "))
        .unwrap_or_default()
        .to_string()
}

/// Valid JSON for `kind` under the default thresholds.
pub fn fixture(kind: ArtifactKind, topic: &str) -> Value {
    match kind {
        ArtifactKind::Notes => {
            let body = (0..260)
                .map(|i| format!("{}{}", topic, i))
                .collect::<Vec<_>>()
                .join(" ");
            let key_points: Vec<String> = (1..=5)
                .map(|i| format!("Key idea {} about {}", i, topic))
                .collect();
            json!({ "body": body, "key_points": key_points })
        }
        ArtifactKind::Flashcards => {
            let cards: Vec<Value> = ["easy", "easy", "easy", "medium", "medium", "medium", "hard", "hard"]
                .iter()
                .enumerate()
                .map(|(i, difficulty)| {
                    json!({
                        "prompt": format!("Question {} about {}?", i + 1, topic),
                        "answer": format!("Answer {} for {}", i + 1, topic),
                        "difficulty": difficulty,
                    })
                })
                .collect();
            json!({ "flashcards": cards })
        }
        ArtifactKind::Quiz => {
            let mut questions: Vec<Value> = (1..=4)
                .map(|i| {
                    json!({
                        "question": format!("Which statement about {} is number {}?", topic, i),
                        "question_type": "multiple_choice",
                        "options": ["Option A", "Option B", "Option C", "Option D"],
                        "correct_answer": "Option B",
                        "explanation": format!("Option B describes {} correctly.", topic),
                        "difficulty": "medium",
                    })
                })
                .collect();
            questions.extend((1..=2).map(|i| {
                json!({
                    "question": format!("Statement {} about {} holds.", i, topic),
                    "question_type": "true_false",
                    "options": ["True", "False"],
                    "correct_answer": "True",
                    "explanation": format!("The statement about {} is accurate.", topic),
                    "difficulty": "easy",
                })
            }));
            json!({ "questions": questions })
        }
        ArtifactKind::Practice => {
            let questions: Vec<Value> = (1..=3)
                .map(|i| {
                    json!({
                        "question": format!("Explain part {} of {} in detail.", i, topic),
                        "marks": 3,
                        "mark_scheme": [
                            {"point": "States the definition", "marks": 1},
                            {"point": "Gives an example", "marks": 1},
                            {"point": "Links cause and effect", "marks": 1}
                        ],
                        "model_answer": format!("A full answer explaining part {} of {}.", i, topic),
                        "difficulty": "higher",
                    })
                })
                .collect();
            json!({ "questions": questions })
        }
        ArtifactKind::Recall => {
            let prompts: Vec<Value> = (1..=5)
                .map(|i| {
                    json!({
                        "prompt": format!("Recall fact {} about {}.", i, topic),
                        "hints": [format!("Think about {}", topic)],
                        "model_answer": format!("Fact {} about {} in full.", i, topic),
                        "key_points": [format!("Point {}", i)],
                    })
                })
                .collect();
            json!({ "prompts": prompts })
        }
    }
}

/// A bundle with every kind generated, as the scripted client would produce it.
pub fn complete_bundle(group: &str, unit: &str) -> ContentBundle {
    let thresholds = QualityThresholds::default();
    let mut bundle = ContentBundle::new(UnitKey::new(group, unit));
    for kind in ArtifactKind::ALL {
        let artifact = parse_artifact(kind, fixture(kind, unit), &thresholds)
            .unwrap_or_else(|e| panic!("fixture for {} is invalid: {}", kind, e));
        bundle.set(artifact);
    }
    bundle
}

/// Generation client driven by prompt contents.
#[derive(Default)]
pub struct ScriptedClient {
    failures: Mutex<HashMap<String, ProviderError>>,
    overrides: Mutex<HashMap<(String, ArtifactKind), String>>,
    calls: Mutex<Vec<(String, ArtifactKind)>>,
}

impl ScriptedClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every call for `topic` fails with `err`.
    pub fn fail_topic(&self, topic: &str, err: ProviderError) {
        self.failures
            .lock()
            .unwrap()
            .insert(topic.to_string(), err);
    }

    /// Reply with `raw` instead of the fixture for one topic and kind.
    pub fn respond_with(&self, topic: &str, kind: ArtifactKind, raw: &str) {
        self.overrides
            .lock()
            .unwrap()
            .insert((topic.to_string(), kind), raw.to_string());
    }

    pub fn calls(&self) -> Vec<(String, ArtifactKind)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, topic: &str) -> usize {
        self.calls().iter().filter(|(t, _)| t == topic).count()
    }
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let kind = kind_of(&request.prompt);
        let topic = topic_of(&request.prompt);
        self.calls.lock().unwrap().push((topic.clone(), kind));

        if let Some(err) = self.failures.lock().unwrap().get(&topic) {
            return Err(err.clone());
        }
        if let Some(raw) = self.overrides.lock().unwrap().get(&(topic.clone(), kind)) {
            return Ok(raw.clone());
        }
        Ok(format!(
            "Here is the requested content.\n```json\n{}\n```",
            fixture(kind, &topic)
        ))
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }
}

/// In-memory store seeded with `groups`, as (group slug, unit slugs). Unit names
/// equal their slugs so prompts can be matched by topic.
pub async fn seeded_store(groups: &[(&str, &[&str])]) -> Arc<SqliteContentStore> {
    let store = SqliteContentStore::in_memory().await.unwrap();
    for (g, (group, units)) in groups.iter().enumerate() {
        store
            .upsert_group(&Group {
                slug: group.to_string(),
                name: group.to_uppercase(),
                order_index: g as i64,
            })
            .await
            .unwrap();
        for (u, unit) in units.iter().enumerate() {
            store
                .upsert_unit(&Unit {
                    group_slug: group.to_string(),
                    slug: unit.to_string(),
                    name: unit.to_string(),
                    order_index: u as i64,
                    objectives: vec![],
                })
                .await
                .unwrap();
        }
    }
    Arc::new(store)
}

/// Write complete content for every unit of `group` directly, bypassing generation.
pub async fn store_complete_content(store: &SqliteContentStore, group: &str, units: &[&str]) {
    let bundles: Vec<ContentBundle> = units.iter().map(|u| complete_bundle(group, u)).collect();
    let emission = Emitter::emit_group(store, group, &bundles).await;
    assert!(!emission.has_failures());
}

pub fn checkpoint_path(dir: &Path) -> PathBuf {
    dir.join("progress.json")
}

pub fn spool(dir: &Path) -> BundleSpool {
    BundleSpool::new(dir.join("spool"))
}

/// Orchestrator over `store` with no pacing and immediate retries.
pub fn orchestrator(
    store: Arc<SqliteContentStore>,
    client: Arc<ScriptedClient>,
    dir: &Path,
) -> BatchOrchestrator {
    let generator = ContentGenerator::new(client, QualityThresholds::default())
        .with_retry(RetryPolicy::immediate(3))
        .with_call_delay(Duration::ZERO);
    orchestrator_without_generator(store, dir).with_generator(generator)
}

pub fn orchestrator_without_generator(
    store: Arc<SqliteContentStore>,
    dir: &Path,
) -> BatchOrchestrator {
    BatchOrchestrator::new(
        store,
        Box::new(FileCheckpointStore::new(checkpoint_path(dir))),
        spool(dir),
        Validator::new(QualityThresholds::default()),
    )
    .with_group_delay(Duration::ZERO)
}

pub fn slugs(groups: &[&str]) -> Vec<String> {
    groups.iter().map(|g| g.to_string()).collect()
}
