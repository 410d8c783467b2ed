//! Per-kind prompt construction.
//!
//! Wording is not load-bearing; what matters is that each prompt names the JSON shape
//! and the counts the schema check will enforce.

use crate::content::{ArtifactKind, QualityThresholds};
use crate::generator::UnitContext;
use crate::provider::GenerationRequest;

const SYSTEM_PROMPT: &str = "You are an experienced teacher writing revision material for \
secondary-school students. Write accurate, clear, exam-focused content. Respond with JSON \
only: no commentary, no markdown outside a single optional ```json block.";

#[derive(Debug, Clone)]
pub struct PromptBuilder {
    thresholds: QualityThresholds,
    max_output_tokens: u32,
    temperature: Option<f32>,
}

impl PromptBuilder {
    pub fn new(thresholds: QualityThresholds, max_output_tokens: u32, temperature: Option<f32>) -> Self {
        Self {
            thresholds,
            max_output_tokens,
            temperature,
        }
    }

    pub fn request(&self, kind: ArtifactKind, unit: &UnitContext) -> GenerationRequest {
        GenerationRequest {
            system: SYSTEM_PROMPT.to_string(),
            prompt: format!(
                "{}\n\n{}\n\nReturn JSON with this shape:\n{}",
                self.topic_line(unit),
                self.instructions(kind),
                shape(kind)
            ),
            max_output_tokens: self.max_output_tokens,
            temperature: self.temperature,
        }
    }

    fn topic_line(&self, unit: &UnitContext) -> String {
        let mut line = format!(
            "Subject: {}\nTopic: {}",
            unit.group_name, unit.unit.name
        );
        if !unit.unit.objectives.is_empty() {
            line.push_str("\nLearning objectives:");
            for objective in &unit.unit.objectives {
                line.push_str("\n- ");
                line.push_str(objective);
            }
        }
        line
    }

    fn instructions(&self, kind: ArtifactKind) -> String {
        let t = &self.thresholds;
        match kind {
            ArtifactKind::Notes => format!(
                "Write revision notes of at least {} words and at least {} key points.",
                t.notes_min_words, t.notes_min_key_points
            ),
            ArtifactKind::Flashcards => format!(
                "Write exactly {} flashcards: {} easy, {} medium and {} hard.",
                t.flashcard_target(),
                t.flashcards_easy,
                t.flashcards_medium,
                t.flashcards_hard
            ),
            ArtifactKind::Quiz => format!(
                "Write exactly {} quiz questions: {} multiple_choice with exactly {} options \
                 and {} true_false with options [\"True\", \"False\"]. The correct_answer must \
                 be copied verbatim from the options.",
                t.quiz_target(),
                t.quiz_multiple_choice,
                t.quiz_options,
                t.quiz_true_false
            ),
            ArtifactKind::Practice => format!(
                "Write exactly {} exam-style practice questions. Each mark_scheme must list \
                 creditworthy points whose marks add up to the question's marks.",
                t.practice_count
            ),
            ArtifactKind::Recall => format!(
                "Write exactly {} active-recall prompts, each with hints, a model answer and \
                 at least one key point.",
                t.recall_count
            ),
        }
    }
}

fn shape(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::Notes => r#"{"body": "...", "key_points": ["..."]}"#,
        ArtifactKind::Flashcards => {
            r#"{"flashcards": [{"prompt": "...", "answer": "...", "difficulty": "easy|medium|hard"}]}"#
        }
        ArtifactKind::Quiz => {
            r#"{"questions": [{"question": "...", "question_type": "multiple_choice|true_false", "options": ["..."], "correct_answer": "...", "explanation": "...", "difficulty": "easy|medium|hard"}]}"#
        }
        ArtifactKind::Practice => {
            r#"{"questions": [{"question": "...", "marks": 4, "mark_scheme": [{"point": "...", "marks": 1}], "model_answer": "...", "difficulty": "foundation|higher|extended"}]}"#
        }
        ArtifactKind::Recall => {
            r#"{"prompts": [{"prompt": "...", "hints": ["..."], "model_answer": "...", "key_points": ["..."]}]}"#
        }
    }
}
