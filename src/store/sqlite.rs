//! SQLite content store.
//!
//! Groups and units carry natural keys (`groups.slug`, `units(group_id, slug)`). Notes are
//! keyed by unit; the four ordered collections are keyed by `(unit_id, position)` and are
//! always rewritten whole inside one transaction. List-valued fields are JSON text columns.

use super::{CatalogWriter, ContentSink, ContentStore};
use crate::content::{
    ContentCounts, Difficulty, Flashcard, Group, Notes, PracticeDifficulty, PracticeQuestion,
    QuestionType, QuizQuestion, RecallPrompt, Unit, UnitContent, UnitKey,
};
use crate::error::StorageError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS groups (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        slug TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        order_index INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS units (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        group_id INTEGER NOT NULL REFERENCES groups(id),
        slug TEXT NOT NULL,
        name TEXT NOT NULL,
        order_index INTEGER NOT NULL DEFAULT 0,
        objectives TEXT NOT NULL DEFAULT '[]',
        UNIQUE (group_id, slug)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS notes (
        unit_id INTEGER PRIMARY KEY REFERENCES units(id),
        body TEXT NOT NULL,
        key_points TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS flashcards (
        unit_id INTEGER NOT NULL REFERENCES units(id),
        position INTEGER NOT NULL,
        prompt TEXT NOT NULL,
        answer TEXT NOT NULL,
        difficulty TEXT NOT NULL,
        PRIMARY KEY (unit_id, position)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS quiz_questions (
        unit_id INTEGER NOT NULL REFERENCES units(id),
        position INTEGER NOT NULL,
        question TEXT NOT NULL,
        question_type TEXT NOT NULL,
        options TEXT NOT NULL,
        correct_answer TEXT NOT NULL,
        explanation TEXT NOT NULL,
        difficulty TEXT NOT NULL,
        PRIMARY KEY (unit_id, position)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS practice_questions (
        unit_id INTEGER NOT NULL REFERENCES units(id),
        position INTEGER NOT NULL,
        question TEXT NOT NULL,
        marks INTEGER NOT NULL,
        mark_scheme TEXT NOT NULL,
        model_answer TEXT NOT NULL,
        difficulty TEXT NOT NULL,
        PRIMARY KEY (unit_id, position)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS recall_prompts (
        unit_id INTEGER NOT NULL REFERENCES units(id),
        position INTEGER NOT NULL,
        prompt TEXT NOT NULL,
        hints TEXT NOT NULL,
        model_answer TEXT NOT NULL,
        key_points TEXT NOT NULL,
        PRIMARY KEY (unit_id, position)
    )
    "#,
];

pub struct SqliteContentStore {
    pool: Pool<Sqlite>,
}

impl SqliteContentStore {
    /// Open (creating if missing) the database at `path` and bootstrap the schema.
    pub async fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await?;
        info!(path = %path.display(), "opened content database");
        Self::with_pool(pool).await
    }

    /// Private in-memory database; one long-lived connection so the data survives.
    pub async fn in_memory() -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::with_pool(pool).await
    }

    pub async fn with_pool(pool: Pool<Sqlite>) -> Result<Self, StorageError> {
        let store = Self { pool };
        store.init_tables().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    async fn init_tables(&self) -> Result<(), StorageError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!("content schema ready");
        Ok(())
    }

    async fn group_id(&self, slug: &str) -> Result<i64, StorageError> {
        sqlx::query_scalar("SELECT id FROM groups WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::GroupNotFound(slug.to_string()))
    }

    async fn unit_id(&self, key: &UnitKey) -> Result<i64, StorageError> {
        sqlx::query_scalar(
            r#"
            SELECT u.id FROM units u
            JOIN groups g ON g.id = u.group_id
            WHERE g.slug = ? AND u.slug = ?
            "#,
        )
        .bind(&key.group)
        .bind(&key.unit)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StorageError::UnitNotFound(key.to_string()))
    }

    async fn count_rows(&self, table: &str, unit_id: i64) -> Result<usize, StorageError> {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {} WHERE unit_id = ?",
            table
        ))
        .bind(unit_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count as usize)
    }
}

#[async_trait]
impl ContentStore for SqliteContentStore {
    async fn list_groups(&self) -> Result<Vec<Group>, StorageError> {
        let rows = sqlx::query("SELECT slug, name, order_index FROM groups ORDER BY order_index, slug")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(group_from_row).collect()
    }

    async fn get_group(&self, slug: &str) -> Result<Option<Group>, StorageError> {
        let row = sqlx::query("SELECT slug, name, order_index FROM groups WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(group_from_row).transpose()
    }

    async fn list_units(&self, group_slug: &str) -> Result<Vec<Unit>, StorageError> {
        let group_id = self.group_id(group_slug).await?;
        let rows = sqlx::query(
            r#"
            SELECT slug, name, order_index, objectives FROM units
            WHERE group_id = ?
            ORDER BY order_index, slug
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(Unit {
                    group_slug: group_slug.to_string(),
                    slug: row.try_get("slug")?,
                    name: row.try_get("name")?,
                    order_index: row.try_get("order_index")?,
                    objectives: from_json(row, "objectives")?,
                })
            })
            .collect()
    }

    async fn load_unit_content(&self, key: &UnitKey) -> Result<UnitContent, StorageError> {
        let unit_id = self.unit_id(key).await?;

        let notes = sqlx::query("SELECT body, key_points FROM notes WHERE unit_id = ?")
            .bind(unit_id)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| -> Result<Notes, StorageError> {
                Ok(Notes {
                    body: row.try_get("body")?,
                    key_points: from_json(&row, "key_points")?,
                })
            })
            .transpose()?;

        let flashcards = sqlx::query(
            "SELECT prompt, answer, difficulty FROM flashcards WHERE unit_id = ? ORDER BY position",
        )
        .bind(unit_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|row| {
            Ok(Flashcard {
                prompt: row.try_get("prompt")?,
                answer: row.try_get("answer")?,
                difficulty: parse_difficulty(&row.try_get::<String, _>("difficulty")?)?,
            })
        })
        .collect::<Result<Vec<_>, StorageError>>()?;

        let quiz = sqlx::query(
            r#"
            SELECT question, question_type, options, correct_answer, explanation, difficulty
            FROM quiz_questions WHERE unit_id = ? ORDER BY position
            "#,
        )
        .bind(unit_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|row| {
            Ok(QuizQuestion {
                question: row.try_get("question")?,
                question_type: parse_question_type(&row.try_get::<String, _>("question_type")?)?,
                options: from_json(row, "options")?,
                correct_answer: row.try_get("correct_answer")?,
                explanation: row.try_get("explanation")?,
                difficulty: parse_difficulty(&row.try_get::<String, _>("difficulty")?)?,
            })
        })
        .collect::<Result<Vec<_>, StorageError>>()?;

        let practice = sqlx::query(
            r#"
            SELECT question, marks, mark_scheme, model_answer, difficulty
            FROM practice_questions WHERE unit_id = ? ORDER BY position
            "#,
        )
        .bind(unit_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|row| {
            Ok(PracticeQuestion {
                question: row.try_get("question")?,
                marks: row.try_get::<i64, _>("marks")?.max(0) as u32,
                mark_scheme: from_json(row, "mark_scheme")?,
                model_answer: row.try_get("model_answer")?,
                difficulty: parse_practice_difficulty(&row.try_get::<String, _>("difficulty")?)?,
            })
        })
        .collect::<Result<Vec<_>, StorageError>>()?;

        let recall = sqlx::query(
            r#"
            SELECT prompt, hints, model_answer, key_points
            FROM recall_prompts WHERE unit_id = ? ORDER BY position
            "#,
        )
        .bind(unit_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|row| {
            Ok(RecallPrompt {
                prompt: row.try_get("prompt")?,
                hints: from_json(row, "hints")?,
                model_answer: row.try_get("model_answer")?,
                key_points: from_json(row, "key_points")?,
            })
        })
        .collect::<Result<Vec<_>, StorageError>>()?;

        Ok(UnitContent {
            notes,
            flashcards,
            quiz,
            practice,
            recall,
        })
    }

    async fn content_counts(&self, key: &UnitKey) -> Result<ContentCounts, StorageError> {
        let unit_id = self.unit_id(key).await?;
        Ok(ContentCounts {
            notes: self.count_rows("notes", unit_id).await?,
            flashcards: self.count_rows("flashcards", unit_id).await?,
            quiz: self.count_rows("quiz_questions", unit_id).await?,
            practice: self.count_rows("practice_questions", unit_id).await?,
            recall: self.count_rows("recall_prompts", unit_id).await?,
        })
    }
}

#[async_trait]
impl ContentSink for SqliteContentStore {
    async fn upsert_notes(&self, key: &UnitKey, notes: &Notes) -> Result<(), StorageError> {
        let unit_id = self.unit_id(key).await?;
        sqlx::query(
            r#"
            INSERT INTO notes (unit_id, body, key_points, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(unit_id) DO UPDATE SET
                body = excluded.body,
                key_points = excluded.key_points,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(unit_id)
        .bind(&notes.body)
        .bind(serde_json::to_string(&notes.key_points)?)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn replace_flashcards(
        &self,
        key: &UnitKey,
        cards: &[Flashcard],
    ) -> Result<(), StorageError> {
        let unit_id = self.unit_id(key).await?;
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM flashcards WHERE unit_id = ?")
            .bind(unit_id)
            .execute(&mut *tx)
            .await?;
        for (position, card) in cards.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO flashcards (unit_id, position, prompt, answer, difficulty)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(unit_id)
            .bind(position as i64)
            .bind(&card.prompt)
            .bind(&card.answer)
            .bind(card.difficulty.as_str())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn replace_quiz_questions(
        &self,
        key: &UnitKey,
        questions: &[QuizQuestion],
    ) -> Result<(), StorageError> {
        let unit_id = self.unit_id(key).await?;
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM quiz_questions WHERE unit_id = ?")
            .bind(unit_id)
            .execute(&mut *tx)
            .await?;
        for (position, q) in questions.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO quiz_questions
                    (unit_id, position, question, question_type, options,
                     correct_answer, explanation, difficulty)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(unit_id)
            .bind(position as i64)
            .bind(&q.question)
            .bind(q.question_type.as_str())
            .bind(serde_json::to_string(&q.options)?)
            .bind(&q.correct_answer)
            .bind(&q.explanation)
            .bind(q.difficulty.as_str())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn replace_practice_questions(
        &self,
        key: &UnitKey,
        questions: &[PracticeQuestion],
    ) -> Result<(), StorageError> {
        let unit_id = self.unit_id(key).await?;
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM practice_questions WHERE unit_id = ?")
            .bind(unit_id)
            .execute(&mut *tx)
            .await?;
        for (position, q) in questions.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO practice_questions
                    (unit_id, position, question, marks, mark_scheme, model_answer, difficulty)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(unit_id)
            .bind(position as i64)
            .bind(&q.question)
            .bind(q.marks as i64)
            .bind(serde_json::to_string(&q.mark_scheme)?)
            .bind(&q.model_answer)
            .bind(q.difficulty.as_str())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn replace_recall_prompts(
        &self,
        key: &UnitKey,
        prompts: &[RecallPrompt],
    ) -> Result<(), StorageError> {
        let unit_id = self.unit_id(key).await?;
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM recall_prompts WHERE unit_id = ?")
            .bind(unit_id)
            .execute(&mut *tx)
            .await?;
        for (position, p) in prompts.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO recall_prompts
                    (unit_id, position, prompt, hints, model_answer, key_points)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(unit_id)
            .bind(position as i64)
            .bind(&p.prompt)
            .bind(serde_json::to_string(&p.hints)?)
            .bind(&p.model_answer)
            .bind(serde_json::to_string(&p.key_points)?)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl CatalogWriter for SqliteContentStore {
    async fn upsert_group(&self, group: &Group) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO groups (slug, name, order_index)
            VALUES (?, ?, ?)
            ON CONFLICT(slug) DO UPDATE SET
                name = excluded.name,
                order_index = excluded.order_index
            "#,
        )
        .bind(&group.slug)
        .bind(&group.name)
        .bind(group.order_index)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_unit(&self, unit: &Unit) -> Result<(), StorageError> {
        let group_id = self.group_id(&unit.group_slug).await?;
        sqlx::query(
            r#"
            INSERT INTO units (group_id, slug, name, order_index, objectives)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(group_id, slug) DO UPDATE SET
                name = excluded.name,
                order_index = excluded.order_index,
                objectives = excluded.objectives
            "#,
        )
        .bind(group_id)
        .bind(&unit.slug)
        .bind(&unit.name)
        .bind(unit.order_index)
        .bind(serde_json::to_string(&unit.objectives)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn group_from_row(row: &SqliteRow) -> Result<Group, StorageError> {
    Ok(Group {
        slug: row.try_get("slug")?,
        name: row.try_get("name")?,
        order_index: row.try_get("order_index")?,
    })
}

fn from_json<T: serde::de::DeserializeOwned>(row: &SqliteRow, column: &str) -> Result<T, StorageError> {
    let text: String = row.try_get(column)?;
    Ok(serde_json::from_str(&text)?)
}

fn parse_difficulty(value: &str) -> Result<Difficulty, StorageError> {
    match value {
        "easy" => Ok(Difficulty::Easy),
        "medium" => Ok(Difficulty::Medium),
        "hard" => Ok(Difficulty::Hard),
        other => Err(StorageError::InvalidData(format!("unknown difficulty {:?}", other))),
    }
}

fn parse_question_type(value: &str) -> Result<QuestionType, StorageError> {
    match value {
        "multiple_choice" => Ok(QuestionType::MultipleChoice),
        "true_false" => Ok(QuestionType::TrueFalse),
        other => Err(StorageError::InvalidData(format!("unknown question type {:?}", other))),
    }
}

fn parse_practice_difficulty(value: &str) -> Result<PracticeDifficulty, StorageError> {
    match value {
        "foundation" => Ok(PracticeDifficulty::Foundation),
        "higher" => Ok(PracticeDifficulty::Higher),
        "extended" => Ok(PracticeDifficulty::Extended),
        other => Err(StorageError::InvalidData(format!(
            "unknown practice difficulty {:?}",
            other
        ))),
    }
}
