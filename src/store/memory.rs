use std::sync::Mutex;

use async_trait::async_trait;
use chrono::prelude::*;
use uuid::Uuid;

use super::{NoteStore, StoreError};
use crate::model::{Note, NoteChanges};

/// Process-local store with the same owner scoping as the database one.
#[derive(Default)]
pub struct MemoryNoteStore {
    notes: Mutex<Vec<Note>>,
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_notes<T>(&self, f: impl FnOnce(&mut Vec<Note>) -> T) -> T {
        let mut notes = match self.notes.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut notes)
    }
}

fn owned(note: &Note, owner_id: &str, id: Uuid) -> bool {
    note.id == id && note.owner_id == owner_id
}

#[async_trait]
impl NoteStore for MemoryNoteStore {
    async fn insert(&self, note: Note) -> Result<Note, StoreError> {
        self.with_notes(|notes| notes.push(note.clone()));
        Ok(note)
    }

    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<Note>, StoreError> {
        let mut found: Vec<Note> = self.with_notes(|notes| {
            notes
                .iter()
                .rev()
                .filter(|note| note.owner_id == owner_id)
                .cloned()
                .collect()
        });
        // stable: equal timestamps keep the latest insert first
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn find_one(&self, owner_id: &str, id: Uuid) -> Result<Option<Note>, StoreError> {
        Ok(self.with_notes(|notes| notes.iter().find(|n| owned(n, owner_id, id)).cloned()))
    }

    async fn update(
        &self,
        owner_id: &str,
        id: Uuid,
        changes: &NoteChanges,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Note>, StoreError> {
        Ok(self.with_notes(|notes| {
            notes.iter_mut().find(|n| owned(n, owner_id, id)).map(|note| {
                changes.apply_to(note);
                note.updated_at = updated_at.max(note.created_at);
                note.clone()
            })
        }))
    }

    async fn delete(&self, owner_id: &str, id: Uuid) -> Result<Option<Note>, StoreError> {
        Ok(self.with_notes(|notes| {
            notes
                .iter()
                .position(|n| owned(n, owner_id, id))
                .map(|index| notes.remove(index))
        }))
    }

    async fn count_by_owner(&self, owner_id: &str) -> Result<i64, StoreError> {
        Ok(self.with_notes(|notes| notes.iter().filter(|n| n.owner_id == owner_id).count() as i64))
    }
}
