use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{IdentityError, ProfileDirectory};

/// Directory kept in process memory, keyed by user id.
#[derive(Default)]
pub struct MemoryDirectory {
    users: Mutex<HashMap<String, Map<String, Value>>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn users(&self) -> MutexGuard<'_, HashMap<String, Map<String, Value>>> {
        match self.users.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Registers a user; non-object metadata is stored as an empty bag.
    pub fn insert_user(&self, user_id: &str, metadata: Value) {
        let bag = match metadata {
            Value::Object(bag) => bag,
            _ => Map::new(),
        };
        self.users().insert(user_id.to_owned(), bag);
    }

    pub fn metadata(&self, user_id: &str) -> Option<Map<String, Value>> {
        self.users().get(user_id).cloned()
    }
}

#[async_trait]
impl ProfileDirectory for MemoryDirectory {
    async fn public_metadata(&self, user_id: &str) -> Result<Map<String, Value>, IdentityError> {
        self.metadata(user_id)
            .ok_or_else(|| IdentityError::UserNotFound(user_id.to_owned()))
    }

    async fn replace_public_metadata(
        &self,
        user_id: &str,
        metadata: Map<String, Value>,
    ) -> Result<(), IdentityError> {
        match self.users().get_mut(user_id) {
            Some(bag) => {
                *bag = metadata;
                Ok(())
            }
            None => Err(IdentityError::UserNotFound(user_id.to_owned())),
        }
    }
}
