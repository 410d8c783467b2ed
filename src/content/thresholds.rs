//! Quality gates, read from the `[thresholds]` config section.

use super::types::{ArtifactKind, ContentCounts};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityThresholds {
    #[serde(default = "default_notes_min_words")]
    pub notes_min_words: usize,

    #[serde(default = "default_notes_min_key_points")]
    pub notes_min_key_points: usize,

    #[serde(default = "default_flashcards_easy")]
    pub flashcards_easy: usize,

    #[serde(default = "default_flashcards_medium")]
    pub flashcards_medium: usize,

    #[serde(default = "default_flashcards_hard")]
    pub flashcards_hard: usize,

    #[serde(default = "default_quiz_multiple_choice")]
    pub quiz_multiple_choice: usize,

    #[serde(default = "default_quiz_true_false")]
    pub quiz_true_false: usize,

    /// Options required on every multiple-choice question
    #[serde(default = "default_quiz_options")]
    pub quiz_options: usize,

    #[serde(default = "default_practice_count")]
    pub practice_count: usize,

    #[serde(default = "default_recall_count")]
    pub recall_count: usize,

    /// Shortest acceptable descriptive text (prompts, questions, model answers)
    #[serde(default = "default_min_text_chars")]
    pub min_text_chars: usize,
}

fn default_notes_min_words() -> usize {
    250
}

fn default_notes_min_key_points() -> usize {
    5
}

fn default_flashcards_easy() -> usize {
    3
}

fn default_flashcards_medium() -> usize {
    3
}

fn default_flashcards_hard() -> usize {
    2
}

fn default_quiz_multiple_choice() -> usize {
    4
}

fn default_quiz_true_false() -> usize {
    2
}

fn default_quiz_options() -> usize {
    4
}

fn default_practice_count() -> usize {
    3
}

fn default_recall_count() -> usize {
    5
}

fn default_min_text_chars() -> usize {
    8
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            notes_min_words: default_notes_min_words(),
            notes_min_key_points: default_notes_min_key_points(),
            flashcards_easy: default_flashcards_easy(),
            flashcards_medium: default_flashcards_medium(),
            flashcards_hard: default_flashcards_hard(),
            quiz_multiple_choice: default_quiz_multiple_choice(),
            quiz_true_false: default_quiz_true_false(),
            quiz_options: default_quiz_options(),
            practice_count: default_practice_count(),
            recall_count: default_recall_count(),
            min_text_chars: default_min_text_chars(),
        }
    }
}

impl QualityThresholds {
    pub fn flashcard_target(&self) -> usize {
        self.flashcards_easy + self.flashcards_medium + self.flashcards_hard
    }

    pub fn quiz_target(&self) -> usize {
        self.quiz_multiple_choice + self.quiz_true_false
    }

    /// Target item count for a kind. Notes is a singleton.
    pub fn target(&self, kind: ArtifactKind) -> usize {
        match kind {
            ArtifactKind::Notes => 1,
            ArtifactKind::Flashcards => self.flashcard_target(),
            ArtifactKind::Quiz => self.quiz_target(),
            ArtifactKind::Practice => self.practice_count,
            ArtifactKind::Recall => self.recall_count,
        }
    }

    /// Completeness predicate used to skip already-populated units.
    pub fn is_satisfied_by(&self, counts: &ContentCounts) -> bool {
        ArtifactKind::ALL
            .iter()
            .all(|kind| counts.get(*kind) >= self.target(*kind))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.flashcard_target() == 0 {
            return Err("flashcard target must be at least 1".to_string());
        }
        if self.quiz_target() == 0 {
            return Err("quiz target must be at least 1".to_string());
        }
        if self.quiz_multiple_choice > 0 && self.quiz_options < 2 {
            return Err("multiple-choice questions need at least 2 options".to_string());
        }
        if self.practice_count == 0 || self.recall_count == 0 {
            return Err("practice and recall targets must be at least 1".to_string());
        }
        Ok(())
    }
}
