use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const TITLE_MAX_LENGTH: usize = 200;
pub const CONTENT_MAX_LENGTH: usize = 10_000;
pub const TAGS_MAX_COUNT: usize = 10;

#[derive(Debug, Deserialize, sqlx::FromRow, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    pub owner_id: String,
    pub title: String,
    pub content: String,
    pub date: DateTime<Utc>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated create payload. The owner never comes from the client.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    pub date: DateTime<Utc>,
    pub tags: Vec<String>,
}

/// A validated partial update; `None` leaves the stored field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub tags: Option<Vec<String>>,
}

impl NoteChanges {
    pub fn apply_to(&self, note: &mut Note) {
        if let Some(title) = &self.title {
            note.title = title.clone();
        }
        if let Some(content) = &self.content {
            note.content = content.clone();
        }
        if let Some(date) = self.date {
            note.date = date;
        }
        if let Some(tags) = &self.tags {
            note.tags = tags.clone();
        }
    }
}
