use async_trait::async_trait;
use chrono::prelude::*;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::{NoteStore, StoreError};
use crate::model::{Note, NoteChanges};

pub struct PgNoteStore {
    db: Pool<Postgres>,
}

impl PgNoteStore {
    pub fn new(db: Pool<Postgres>) -> Self {
        PgNoteStore { db }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!().run(&self.db).await?;
        Ok(())
    }
}

#[async_trait]
impl NoteStore for PgNoteStore {
    async fn insert(&self, note: Note) -> Result<Note, StoreError> {
        let note = sqlx::query_as::<_, Note>(
            "INSERT INTO notes (id,owner_id,title,content,date,tags,created_at,updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
        )
        .bind(note.id)
        .bind(note.owner_id)
        .bind(note.title)
        .bind(note.content)
        .bind(note.date)
        .bind(note.tags)
        .bind(note.created_at)
        .bind(note.updated_at)
        .fetch_one(&self.db)
        .await?;
        Ok(note)
    }

    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<Note>, StoreError> {
        let notes = sqlx::query_as::<_, Note>(
            "SELECT * FROM notes WHERE owner_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.db)
        .await?;
        Ok(notes)
    }

    async fn find_one(&self, owner_id: &str, id: Uuid) -> Result<Option<Note>, StoreError> {
        let note =
            sqlx::query_as::<_, Note>("SELECT * FROM notes WHERE id = $1 AND owner_id = $2")
                .bind(id)
                .bind(owner_id)
                .fetch_optional(&self.db)
                .await?;
        Ok(note)
    }

    async fn update(
        &self,
        owner_id: &str,
        id: Uuid,
        changes: &NoteChanges,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Note>, StoreError> {
        let note = sqlx::query_as::<_, Note>(
            "UPDATE notes SET \
                title = COALESCE($3, title), \
                content = COALESCE($4, content), \
                date = COALESCE($5, date), \
                tags = COALESCE($6, tags), \
                updated_at = GREATEST($7, created_at) \
             WHERE id = $1 AND owner_id = $2 RETURNING *",
        )
        .bind(id)
        .bind(owner_id)
        .bind(changes.title.clone())
        .bind(changes.content.clone())
        .bind(changes.date)
        .bind(changes.tags.clone())
        .bind(updated_at)
        .fetch_optional(&self.db)
        .await?;
        Ok(note)
    }

    async fn delete(&self, owner_id: &str, id: Uuid) -> Result<Option<Note>, StoreError> {
        let note = sqlx::query_as::<_, Note>(
            "DELETE FROM notes WHERE id = $1 AND owner_id = $2 RETURNING *",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(note)
    }

    async fn count_by_owner(&self, owner_id: &str) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM notes WHERE owner_id = $1")
            .bind(owner_id)
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }
}
