//! Portable SQL export.
//!
//! `SqlScriptWriter` is a `ContentSink` that records the statements a direct import would
//! run, addressing units by `(group slug, unit slug)` subselects instead of row ids. The
//! script can be replayed against any database carrying the same schema and is as
//! idempotent as the direct import.

use super::Emitter;
use crate::content::{
    ContentBundle, Flashcard, Notes, PracticeQuestion, QuizQuestion, RecallPrompt, UnitKey,
};
use crate::error::StorageError;
use crate::store::{ContentSink, ContentStore};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tracing::info;

pub struct SqlScriptWriter {
    group: String,
    statements: Mutex<Vec<String>>,
}

impl SqlScriptWriter {
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            statements: Mutex::new(Vec::new()),
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn statement_count(&self) -> usize {
        self.statements.lock().len()
    }

    /// The full script, wrapped in one transaction.
    pub fn render(&self) -> String {
        let statements = self.statements.lock();
        let mut script = format!(
            "-- coursegen export for group {}\n-- generated {}\nBEGIN;\n",
            self.group,
            Utc::now().to_rfc3339()
        );
        for statement in statements.iter() {
            script.push_str(statement);
            script.push('\n');
        }
        script.push_str("COMMIT;\n");
        script
    }

    /// Write `<dir>/<group>.sql`, returning the path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, StorageError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.sql", self.group));
        std::fs::write(&path, self.render())?;
        info!(
            group = %self.group,
            path = %path.display(),
            statements = self.statement_count(),
            "wrote SQL export"
        );
        Ok(path)
    }

    fn push(&self, statement: String) {
        self.statements.lock().push(statement);
    }

    fn delete(&self, table: &str, key: &UnitKey) {
        self.push(format!(
            "DELETE FROM {} WHERE unit_id = {};",
            table,
            unit_ref(key)
        ));
    }
}

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

fn quote_json<T: serde::Serialize>(value: &T) -> Result<String, StorageError> {
    Ok(quote(&serde_json::to_string(value)?))
}

fn unit_ref(key: &UnitKey) -> String {
    format!(
        "(SELECT u.id FROM units u JOIN groups g ON g.id = u.group_id WHERE g.slug = {} AND u.slug = {})",
        quote(&key.group),
        quote(&key.unit)
    )
}

#[async_trait]
impl ContentSink for SqlScriptWriter {
    async fn upsert_notes(&self, key: &UnitKey, notes: &Notes) -> Result<(), StorageError> {
        self.push(format!(
            "INSERT INTO notes (unit_id, body, key_points, updated_at) VALUES ({}, {}, {}, strftime('%Y-%m-%dT%H:%M:%SZ', 'now')) \
             ON CONFLICT(unit_id) DO UPDATE SET body = excluded.body, key_points = excluded.key_points, updated_at = excluded.updated_at;",
            unit_ref(key),
            quote(&notes.body),
            quote_json(&notes.key_points)?
        ));
        Ok(())
    }

    async fn replace_flashcards(
        &self,
        key: &UnitKey,
        cards: &[Flashcard],
    ) -> Result<(), StorageError> {
        self.delete("flashcards", key);
        for (position, card) in cards.iter().enumerate() {
            self.push(format!(
                "INSERT INTO flashcards (unit_id, position, prompt, answer, difficulty) VALUES ({}, {}, {}, {}, {});",
                unit_ref(key),
                position,
                quote(&card.prompt),
                quote(&card.answer),
                quote(card.difficulty.as_str())
            ));
        }
        Ok(())
    }

    async fn replace_quiz_questions(
        &self,
        key: &UnitKey,
        questions: &[QuizQuestion],
    ) -> Result<(), StorageError> {
        self.delete("quiz_questions", key);
        for (position, q) in questions.iter().enumerate() {
            self.push(format!(
                "INSERT INTO quiz_questions (unit_id, position, question, question_type, options, correct_answer, explanation, difficulty) \
                 VALUES ({}, {}, {}, {}, {}, {}, {}, {});",
                unit_ref(key),
                position,
                quote(&q.question),
                quote(q.question_type.as_str()),
                quote_json(&q.options)?,
                quote(&q.correct_answer),
                quote(&q.explanation),
                quote(q.difficulty.as_str())
            ));
        }
        Ok(())
    }

    async fn replace_practice_questions(
        &self,
        key: &UnitKey,
        questions: &[PracticeQuestion],
    ) -> Result<(), StorageError> {
        self.delete("practice_questions", key);
        for (position, q) in questions.iter().enumerate() {
            self.push(format!(
                "INSERT INTO practice_questions (unit_id, position, question, marks, mark_scheme, model_answer, difficulty) \
                 VALUES ({}, {}, {}, {}, {}, {}, {});",
                unit_ref(key),
                position,
                quote(&q.question),
                q.marks,
                quote_json(&q.mark_scheme)?,
                quote(&q.model_answer),
                quote(q.difficulty.as_str())
            ));
        }
        Ok(())
    }

    async fn replace_recall_prompts(
        &self,
        key: &UnitKey,
        prompts: &[RecallPrompt],
    ) -> Result<(), StorageError> {
        self.delete("recall_prompts", key);
        for (position, p) in prompts.iter().enumerate() {
            self.push(format!(
                "INSERT INTO recall_prompts (unit_id, position, prompt, hints, model_answer, key_points) \
                 VALUES ({}, {}, {}, {}, {}, {});",
                unit_ref(key),
                position,
                quote(&p.prompt),
                quote_json(&p.hints)?,
                quote(&p.model_answer),
                quote_json(&p.key_points)?
            ));
        }
        Ok(())
    }
}

/// Render a group's stored content as a SQL script.
pub async fn export_group<S: ContentStore + ?Sized>(
    store: &S,
    group: &str,
) -> Result<SqlScriptWriter, StorageError> {
    let writer = SqlScriptWriter::new(group);
    for unit in store.list_units(group).await? {
        let key = unit.key();
        let content = store.load_unit_content(&key).await?;
        let bundle = ContentBundle::from_stored(key, content);
        let emission = Emitter::emit_unit(&writer, &bundle).await;
        let first_failure = emission
            .failures()
            .next()
            .map(|(kind, message)| (kind, message.to_string()));
        if let Some((kind, message)) = first_failure {
            return Err(StorageError::InvalidData(format!(
                "could not render {} for {}: {}",
                kind, emission.unit, message
            )));
        }
    }
    Ok(writer)
}
