//! Shape checks for recovered generation output.

use super::rules::artifact_issues;
use super::thresholds::QualityThresholds;
use super::types::{Artifact, ArtifactKind, Notes, QuestionType, QuizQuestion};
use crate::error::SchemaError;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Wrapper keys a model may use around the item list of each collection kind.
fn wrapper_keys(kind: ArtifactKind) -> &'static [&'static str] {
    match kind {
        ArtifactKind::Notes => &["notes"],
        ArtifactKind::Flashcards => &["flashcards", "cards"],
        ArtifactKind::Quiz => &["questions", "quiz", "quiz_questions"],
        ArtifactKind::Practice => &["questions", "practice_questions", "practice"],
        ArtifactKind::Recall => &["prompts", "recall_prompts", "recall"],
    }
}

/// Decode `value` into the artifact for `kind` and apply its count and structure rules.
pub fn parse_artifact(
    kind: ArtifactKind,
    value: Value,
    thresholds: &QualityThresholds,
) -> Result<Artifact, SchemaError> {
    let artifact = match kind {
        ArtifactKind::Notes => Artifact::Notes(decode::<Notes>(kind, unwrap_notes(value))?),
        ArtifactKind::Flashcards => Artifact::Flashcards(decode(kind, unwrap_list(kind, value)?)?),
        ArtifactKind::Quiz => {
            let mut questions: Vec<QuizQuestion> = decode(kind, unwrap_list(kind, value)?)?;
            questions.iter_mut().for_each(normalize_true_false);
            Artifact::Quiz(questions)
        }
        ArtifactKind::Practice => Artifact::Practice(decode(kind, unwrap_list(kind, value)?)?),
        ArtifactKind::Recall => Artifact::Recall(decode(kind, unwrap_list(kind, value)?)?),
    };

    let issues = artifact_issues(&artifact, thresholds);
    if issues.is_empty() {
        Ok(artifact)
    } else {
        Err(SchemaError::new(kind, issues.join("; ")))
    }
}

fn decode<T: DeserializeOwned>(kind: ArtifactKind, value: Value) -> Result<T, SchemaError> {
    serde_json::from_value(value).map_err(|e| SchemaError::new(kind, e.to_string()))
}

fn unwrap_notes(value: Value) -> Value {
    match value {
        Value::Object(mut map) if !map.contains_key("body") && !map.contains_key("content") => {
            match map.remove("notes") {
                Some(inner @ Value::Object(_)) => inner,
                Some(other) => {
                    map.insert("notes".to_string(), other);
                    Value::Object(map)
                }
                None => Value::Object(map),
            }
        }
        other => other,
    }
}

/// Accept a bare array, or an object wrapping it under a known key or as its only array.
fn unwrap_list(kind: ArtifactKind, value: Value) -> Result<Value, SchemaError> {
    match value {
        Value::Array(_) => Ok(value),
        Value::Object(mut map) => {
            for key in wrapper_keys(kind) {
                if let Some(inner @ Value::Array(_)) = map.remove(*key) {
                    return Ok(inner);
                }
            }
            let mut arrays = map.into_iter().filter(|(_, v)| v.is_array());
            match (arrays.next(), arrays.next()) {
                (Some((_, inner)), None) => Ok(inner),
                _ => Err(SchemaError::new(
                    kind,
                    "expected a list of items or an object wrapping one",
                )),
            }
        }
        other => Err(SchemaError::new(
            kind,
            format!("expected a list of items, found {}", json_type(&other)),
        )),
    }
}

fn normalize_true_false(question: &mut QuizQuestion) {
    if question.question_type == QuestionType::TrueFalse && question.options.is_empty() {
        question.options = vec!["True".to_string(), "False".to_string()];
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn small() -> QualityThresholds {
        QualityThresholds {
            notes_min_words: 3,
            notes_min_key_points: 1,
            flashcards_easy: 1,
            flashcards_medium: 1,
            flashcards_hard: 0,
            quiz_multiple_choice: 0,
            quiz_true_false: 1,
            recall_count: 1,
            ..QualityThresholds::default()
        }
    }

    #[test]
    fn wrapped_and_bare_lists_are_equivalent() {
        let cards = json!([
            {"prompt": "Define mitosis", "answer": "Cell division", "difficulty": "easy"},
            {"prompt": "Define meiosis", "answer": "Gamete division", "difficulty": "medium"}
        ]);
        let bare = parse_artifact(ArtifactKind::Flashcards, cards.clone(), &small()).unwrap();
        let wrapped =
            parse_artifact(ArtifactKind::Flashcards, json!({ "flashcards": cards }), &small())
                .unwrap();
        assert_eq!(bare, wrapped);
        assert_eq!(bare.item_count(), 2);
    }

    #[test]
    fn short_count_is_a_schema_error() {
        let cards = json!([
            {"prompt": "Define mitosis", "answer": "Cell division", "difficulty": "easy"}
        ]);
        let err = parse_artifact(ArtifactKind::Flashcards, cards, &small()).unwrap_err();
        assert_eq!(err.kind, ArtifactKind::Flashcards);
        assert!(err.message.contains("1/2"));
    }

    #[test]
    fn true_false_options_are_filled_in() {
        let quiz = json!({"questions": [
            {"question": "Plants photosynthesise.", "type": "true_false", "correct_answer": "True"}
        ]});
        match parse_artifact(ArtifactKind::Quiz, quiz, &small()).unwrap() {
            Artifact::Quiz(questions) => assert_eq!(questions[0].options, vec!["True", "False"]),
            other => panic!("unexpected artifact {:?}", other),
        }
    }

    #[test]
    fn notes_accept_wrapper_object() {
        let notes = json!({"notes": {"body": "Cells are small units", "key_points": ["cells"]}});
        assert!(parse_artifact(ArtifactKind::Notes, notes, &small()).is_ok());
    }

    #[test]
    fn scalar_is_rejected() {
        let err = parse_artifact(ArtifactKind::Recall, json!("nope"), &small()).unwrap_err();
        assert!(err.message.contains("a string"));
    }
}
