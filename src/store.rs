//! Content datastore seams.
//!
//! `ContentStore` is the read side (catalog and persisted content), `ContentSink` the
//! natural-key write side used by emission, `CatalogWriter` the seeding side. The SQLite
//! implementation backs all three; the SQL script exporter implements only the sink.

use crate::content::{
    ContentCounts, Flashcard, Group, Notes, PracticeQuestion, QuizQuestion, RecallPrompt, Unit,
    UnitContent, UnitKey,
};
use crate::error::StorageError;
use async_trait::async_trait;

pub mod sqlite;

pub use sqlite::SqliteContentStore;

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// All groups by order index.
    async fn list_groups(&self) -> Result<Vec<Group>, StorageError>;

    async fn get_group(&self, slug: &str) -> Result<Option<Group>, StorageError>;

    /// Units of a group by order index. Unknown group is an error.
    async fn list_units(&self, group_slug: &str) -> Result<Vec<Unit>, StorageError>;

    async fn load_unit_content(&self, key: &UnitKey) -> Result<UnitContent, StorageError>;

    async fn content_counts(&self, key: &UnitKey) -> Result<ContentCounts, StorageError>;
}

/// Idempotent writes addressed by unit natural key.
#[async_trait]
pub trait ContentSink: Send + Sync {
    /// Insert or overwrite the unit's notes.
    async fn upsert_notes(&self, key: &UnitKey, notes: &Notes) -> Result<(), StorageError>;

    /// Delete the unit's flashcards, then insert `cards` in order.
    async fn replace_flashcards(
        &self,
        key: &UnitKey,
        cards: &[Flashcard],
    ) -> Result<(), StorageError>;

    async fn replace_quiz_questions(
        &self,
        key: &UnitKey,
        questions: &[QuizQuestion],
    ) -> Result<(), StorageError>;

    async fn replace_practice_questions(
        &self,
        key: &UnitKey,
        questions: &[PracticeQuestion],
    ) -> Result<(), StorageError>;

    async fn replace_recall_prompts(
        &self,
        key: &UnitKey,
        prompts: &[RecallPrompt],
    ) -> Result<(), StorageError>;
}

/// Catalog seeding: upsert groups and units by natural key.
#[async_trait]
pub trait CatalogWriter: Send + Sync {
    async fn upsert_group(&self, group: &Group) -> Result<(), StorageError>;

    async fn upsert_unit(&self, unit: &Unit) -> Result<(), StorageError>;
}

/// A store that can be both read and written; what the orchestrator drives.
pub trait ContentRepository: ContentStore + ContentSink {}

impl<T: ContentStore + ContentSink> ContentRepository for T {}
