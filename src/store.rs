use async_trait::async_trait;
use chrono::prelude::*;
use thiserror::Error;
use uuid::Uuid;

use crate::model::{Note, NoteChanges};

mod memory;
mod postgres;

pub use memory::MemoryNoteStore;
pub use postgres::PgNoteStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Document store for notes. Every lookup is keyed by owner and id together.
#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn insert(&self, note: Note) -> Result<Note, StoreError>;

    /// All notes of `owner_id`, newest created first.
    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<Note>, StoreError>;

    async fn find_one(&self, owner_id: &str, id: Uuid) -> Result<Option<Note>, StoreError>;

    async fn update(
        &self,
        owner_id: &str,
        id: Uuid,
        changes: &NoteChanges,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Note>, StoreError>;

    async fn delete(&self, owner_id: &str, id: Uuid) -> Result<Option<Note>, StoreError>;

    async fn count_by_owner(&self, owner_id: &str) -> Result<i64, StoreError>;
}
