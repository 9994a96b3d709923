use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::{IdentityError, ProfileDirectory};

pub const DEFAULT_CLERK_API_URL: &str = "https://api.clerk.com/v1";

#[derive(Debug, Clone)]
pub struct ClerkConfig {
    pub secret_key: String,
    pub api_url: String,
}

#[derive(Deserialize)]
struct ClerkUser {
    #[serde(default)]
    public_metadata: Option<Map<String, Value>>,
}

/// Backend API client, built once and shared for the process lifetime.
#[derive(Clone)]
pub struct ClerkDirectory {
    client: reqwest::Client,
    base: Url,
    secret_key: String,
}

impl ClerkDirectory {
    pub fn new(config: ClerkConfig) -> Result<Self, IdentityError> {
        let base = Url::parse(&config.api_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| IdentityError::InvalidApiUrl(config.api_url.clone()))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(ClerkDirectory {
            client,
            base,
            secret_key: config.secret_key,
        })
    }

    /// `{base}/users/{user_id}/{rest..}`, each segment percent-encoded.
    fn user_url(&self, user_id: &str, rest: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push("users")
                .push(user_id)
                .extend(rest);
        }
        url
    }
}

async fn check(user_id: &str, response: reqwest::Response) -> Result<reqwest::Response, IdentityError> {
    match response.status() {
        status if status.is_success() => Ok(response),
        StatusCode::NOT_FOUND => Err(IdentityError::UserNotFound(user_id.to_owned())),
        status => {
            let body = response.text().await.unwrap_or_default();
            Err(IdentityError::Api {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl ProfileDirectory for ClerkDirectory {
    async fn public_metadata(&self, user_id: &str) -> Result<Map<String, Value>, IdentityError> {
        let response = self
            .client
            .get(self.user_url(user_id, &[]))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;
        let user: ClerkUser = check(user_id, response).await?.json().await?;
        Ok(user.public_metadata.unwrap_or_default())
    }

    async fn replace_public_metadata(
        &self,
        user_id: &str,
        metadata: Map<String, Value>,
    ) -> Result<(), IdentityError> {
        debug!(user = user_id, "Updating public metadata");
        let response = self
            .client
            .patch(self.user_url(user_id, &["metadata"]))
            .bearer_auth(&self.secret_key)
            .json(&json!({ "public_metadata": metadata }))
            .send()
            .await?;
        check(user_id, response).await?;
        Ok(())
    }
}
