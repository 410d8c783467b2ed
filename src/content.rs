//! Content model: catalog entities, the five artifact kinds, per-unit bundles, and the
//! quality gates every generated or stored artifact is measured against.

pub mod rules;
pub mod schema;
pub mod thresholds;
pub mod types;

pub use thresholds::QualityThresholds;
pub use types::{
    Artifact, ArtifactFailure, ArtifactKind, ContentBundle, ContentCounts, Difficulty,
    FailureStage, Flashcard, Group, MarkPoint, Notes, PracticeDifficulty, PracticeQuestion,
    QuestionType, QuizQuestion, RecallPrompt, Slot, Unit, UnitContent, UnitKey,
};
