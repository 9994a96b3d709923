use std::sync::Arc;

use chrono::prelude::*;
use uuid::Uuid;

use crate::{
    model::{NewNote, Note, NoteChanges},
    store::{NoteStore, StoreError},
};

/// Note CRUD scoped to one owner per call. Absent results mean "no note
/// with this id belongs to the caller", whether or not it exists.
#[derive(Clone)]
pub struct NoteService {
    store: Arc<dyn NoteStore>,
}

impl NoteService {
    pub fn new(store: Arc<dyn NoteStore>) -> Self {
        NoteService { store }
    }

    pub async fn create(&self, owner_id: &str, new_note: NewNote) -> Result<Note, StoreError> {
        let now = Utc::now();
        let note = Note {
            id: Uuid::new_v4(),
            owner_id: owner_id.to_owned(),
            title: new_note.title,
            content: new_note.content,
            date: new_note.date,
            tags: new_note.tags,
            created_at: now,
            updated_at: now,
        };
        self.store.insert(note).await
    }

    pub async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Note>, StoreError> {
        self.store.find_by_owner(owner_id).await
    }

    pub async fn get_by_id(&self, owner_id: &str, id: Uuid) -> Result<Option<Note>, StoreError> {
        self.store.find_one(owner_id, id).await
    }

    pub async fn update(
        &self,
        owner_id: &str,
        id: Uuid,
        changes: &NoteChanges,
    ) -> Result<Option<Note>, StoreError> {
        self.store.update(owner_id, id, changes, Utc::now()).await
    }

    pub async fn delete(&self, owner_id: &str, id: Uuid) -> Result<Option<Note>, StoreError> {
        self.store.delete(owner_id, id).await
    }

    pub async fn count_by_owner(&self, owner_id: &str) -> Result<i64, StoreError> {
        self.store.count_by_owner(owner_id).await
    }
}
