use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

mod clerk;
mod memory;

pub use clerk::{ClerkConfig, ClerkDirectory, DEFAULT_CLERK_API_URL};
pub use memory::MemoryDirectory;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("User {0} not found")]
    UserNotFound(String),

    #[error("Request to identity provider failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Identity provider returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Identity provider API URL {0:?} is not a valid base URL")]
    InvalidApiUrl(String),

    #[error("Profile metadata is malformed: {0}")]
    InvalidMetadata(serde_json::Error),
}

/// User records owned by the external identity provider. Only the public
/// metadata bag is read or written here.
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn public_metadata(&self, user_id: &str) -> Result<Map<String, Value>, IdentityError>;

    async fn replace_public_metadata(
        &self,
        user_id: &str,
        metadata: Map<String, Value>,
    ) -> Result<(), IdentityError>;
}
