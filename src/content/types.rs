//! Catalog entities and artifact shapes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The five artifact kinds generated for every unit, in generation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Notes,
    Flashcards,
    Quiz,
    Practice,
    Recall,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 5] = [
        ArtifactKind::Notes,
        ArtifactKind::Flashcards,
        ArtifactKind::Quiz,
        ArtifactKind::Practice,
        ArtifactKind::Recall,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Notes => "notes",
            ArtifactKind::Flashcards => "flashcards",
            ArtifactKind::Quiz => "quiz",
            ArtifactKind::Practice => "practice",
            ArtifactKind::Recall => "recall",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A subject: the batch and checkpoint granularity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub slug: String,
    pub name: String,
    pub order_index: i64,
}

/// A subtopic inside a group. Owns one content bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub group_slug: String,
    pub slug: String,
    pub name: String,
    pub order_index: i64,
    #[serde(default)]
    pub objectives: Vec<String>,
}

impl Unit {
    pub fn key(&self) -> UnitKey {
        UnitKey::new(&self.group_slug, &self.slug)
    }
}

/// Natural key of a unit: (group slug, unit slug).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitKey {
    pub group: String,
    pub unit: String,
}

impl UnitKey {
    pub fn new(group: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            unit: unit.into(),
        }
    }
}

impl fmt::Display for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, self.unit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[serde(alias = "Easy", alias = "EASY")]
    Easy,
    #[serde(alias = "Medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "Hard", alias = "HARD")]
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Medium
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    #[serde(alias = "multiple-choice", alias = "mcq", alias = "MultipleChoice")]
    MultipleChoice,
    #[serde(alias = "true-false", alias = "TrueFalse", alias = "boolean")]
    TrueFalse,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::TrueFalse => "true_false",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PracticeDifficulty {
    #[serde(alias = "Foundation")]
    Foundation,
    #[serde(alias = "Higher")]
    Higher,
    #[serde(alias = "Extended")]
    Extended,
}

impl PracticeDifficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            PracticeDifficulty::Foundation => "foundation",
            PracticeDifficulty::Higher => "higher",
            PracticeDifficulty::Extended => "extended",
        }
    }
}

impl Default for PracticeDifficulty {
    fn default() -> Self {
        PracticeDifficulty::Foundation
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notes {
    #[serde(alias = "content")]
    pub body: String,
    #[serde(default)]
    pub key_points: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    #[serde(alias = "front", alias = "question")]
    pub prompt: String,
    #[serde(alias = "back")]
    pub answer: String,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    #[serde(alias = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(alias = "answer")]
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkPoint {
    pub point: String,
    pub marks: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeQuestion {
    pub question: String,
    pub marks: u32,
    #[serde(default)]
    pub mark_scheme: Vec<MarkPoint>,
    #[serde(default)]
    pub model_answer: String,
    #[serde(default)]
    pub difficulty: PracticeDifficulty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecallPrompt {
    pub prompt: String,
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default)]
    pub model_answer: String,
    #[serde(default)]
    pub key_points: Vec<String>,
}

/// A parsed, shape-checked artifact of one kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    Notes(Notes),
    Flashcards(Vec<Flashcard>),
    Quiz(Vec<QuizQuestion>),
    Practice(Vec<PracticeQuestion>),
    Recall(Vec<RecallPrompt>),
}

impl Artifact {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Artifact::Notes(_) => ArtifactKind::Notes,
            Artifact::Flashcards(_) => ArtifactKind::Flashcards,
            Artifact::Quiz(_) => ArtifactKind::Quiz,
            Artifact::Practice(_) => ArtifactKind::Practice,
            Artifact::Recall(_) => ArtifactKind::Recall,
        }
    }

    pub fn item_count(&self) -> usize {
        match self {
            Artifact::Notes(_) => 1,
            Artifact::Flashcards(items) => items.len(),
            Artifact::Quiz(items) => items.len(),
            Artifact::Practice(items) => items.len(),
            Artifact::Recall(items) => items.len(),
        }
    }
}

/// Pipeline stage at which an artifact failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// Group or units could not be read from the catalog.
    Catalog,
    Provider,
    Recovery,
    Schema,
    Terminal,
    Spool,
    Write,
    Validation,
    /// The group's checkpoint record refused a step transition.
    Checkpoint,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureStage::Catalog => "catalog",
            FailureStage::Provider => "provider",
            FailureStage::Recovery => "recovery",
            FailureStage::Schema => "schema",
            FailureStage::Terminal => "terminal",
            FailureStage::Spool => "spool",
            FailureStage::Write => "write",
            FailureStage::Validation => "validation",
            FailureStage::Checkpoint => "checkpoint",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFailure {
    pub stage: FailureStage,
    pub message: String,
}

/// One kind's slot in a bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Slot<T> {
    Missing,
    Generated(T),
    Failed(ArtifactFailure),
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Slot::Missing
    }
}

impl<T> Slot<T> {
    pub fn is_generated(&self) -> bool {
        matches!(self, Slot::Generated(_))
    }

    pub fn generated(&self) -> Option<&T> {
        match self {
            Slot::Generated(value) => Some(value),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&ArtifactFailure> {
        match self {
            Slot::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Generated content for one unit, one slot per kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBundle {
    pub unit: UnitKey,
    #[serde(default)]
    pub notes: Slot<Notes>,
    #[serde(default)]
    pub flashcards: Slot<Vec<Flashcard>>,
    #[serde(default)]
    pub quiz: Slot<Vec<QuizQuestion>>,
    #[serde(default)]
    pub practice: Slot<Vec<PracticeQuestion>>,
    #[serde(default)]
    pub recall: Slot<Vec<RecallPrompt>>,
}

impl ContentBundle {
    pub fn new(unit: UnitKey) -> Self {
        Self {
            unit,
            notes: Slot::Missing,
            flashcards: Slot::Missing,
            quiz: Slot::Missing,
            practice: Slot::Missing,
            recall: Slot::Missing,
        }
    }

    /// Build a fully generated bundle from stored content. Empty collections stay missing.
    pub fn from_stored(unit: UnitKey, content: UnitContent) -> Self {
        fn slot<T>(items: Vec<T>) -> Slot<Vec<T>> {
            if items.is_empty() {
                Slot::Missing
            } else {
                Slot::Generated(items)
            }
        }
        Self {
            unit,
            notes: content.notes.map(Slot::Generated).unwrap_or_default(),
            flashcards: slot(content.flashcards),
            quiz: slot(content.quiz),
            practice: slot(content.practice),
            recall: slot(content.recall),
        }
    }

    pub fn set(&mut self, artifact: Artifact) {
        match artifact {
            Artifact::Notes(v) => self.notes = Slot::Generated(v),
            Artifact::Flashcards(v) => self.flashcards = Slot::Generated(v),
            Artifact::Quiz(v) => self.quiz = Slot::Generated(v),
            Artifact::Practice(v) => self.practice = Slot::Generated(v),
            Artifact::Recall(v) => self.recall = Slot::Generated(v),
        }
    }

    pub fn fail(&mut self, kind: ArtifactKind, failure: ArtifactFailure) {
        match kind {
            ArtifactKind::Notes => self.notes = Slot::Failed(failure),
            ArtifactKind::Flashcards => self.flashcards = Slot::Failed(failure),
            ArtifactKind::Quiz => self.quiz = Slot::Failed(failure),
            ArtifactKind::Practice => self.practice = Slot::Failed(failure),
            ArtifactKind::Recall => self.recall = Slot::Failed(failure),
        }
    }

    pub fn is_generated(&self, kind: ArtifactKind) -> bool {
        match kind {
            ArtifactKind::Notes => self.notes.is_generated(),
            ArtifactKind::Flashcards => self.flashcards.is_generated(),
            ArtifactKind::Quiz => self.quiz.is_generated(),
            ArtifactKind::Practice => self.practice.is_generated(),
            ArtifactKind::Recall => self.recall.is_generated(),
        }
    }

    pub fn failure(&self, kind: ArtifactKind) -> Option<&ArtifactFailure> {
        match kind {
            ArtifactKind::Notes => self.notes.failure(),
            ArtifactKind::Flashcards => self.flashcards.failure(),
            ArtifactKind::Quiz => self.quiz.failure(),
            ArtifactKind::Practice => self.practice.failure(),
            ArtifactKind::Recall => self.recall.failure(),
        }
    }

    /// True only when every kind is generated.
    pub fn is_complete(&self) -> bool {
        ArtifactKind::ALL.iter().all(|kind| self.is_generated(*kind))
    }

    pub fn failures(&self) -> Vec<(ArtifactKind, &ArtifactFailure)> {
        ArtifactKind::ALL
            .iter()
            .filter_map(|kind| self.failure(*kind).map(|f| (*kind, f)))
            .collect()
    }
}

/// Content for one unit as currently persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitContent {
    pub notes: Option<Notes>,
    pub flashcards: Vec<Flashcard>,
    pub quiz: Vec<QuizQuestion>,
    pub practice: Vec<PracticeQuestion>,
    pub recall: Vec<RecallPrompt>,
}

impl UnitContent {
    pub fn counts(&self) -> ContentCounts {
        ContentCounts {
            notes: usize::from(self.notes.is_some()),
            flashcards: self.flashcards.len(),
            quiz: self.quiz.len(),
            practice: self.practice.len(),
            recall: self.recall.len(),
        }
    }
}

/// Stored item counts per kind for one unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentCounts {
    pub notes: usize,
    pub flashcards: usize,
    pub quiz: usize,
    pub practice: usize,
    pub recall: usize,
}

impl ContentCounts {
    pub fn get(&self, kind: ArtifactKind) -> usize {
        match kind {
            ArtifactKind::Notes => self.notes,
            ArtifactKind::Flashcards => self.flashcards,
            ArtifactKind::Quiz => self.quiz,
            ArtifactKind::Practice => self.practice,
            ArtifactKind::Recall => self.recall,
        }
    }
}
