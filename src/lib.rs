//! Braggy: a personal notes service.
//!
//! Notes are private to the identity-provider subject that created them.
//! Free accounts hold at most ten notes; premium access is read from the
//! caller's profile metadata, which billing webhooks keep current.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod handler;
pub mod identity;
pub mod jwt_auth;
pub mod model;
pub mod request;
pub mod response;
pub mod route;
pub mod service;
pub mod signature;
pub mod store;
pub mod subscription;
pub mod webhook;

use identity::ProfileDirectory;
use jwt_auth::TokenVerifier;
use service::NoteService;
use signature::WebhookVerifier;

/// Everything a request handler needs, built once at startup.
pub struct AppState {
    pub notes: NoteService,
    pub directory: Arc<dyn ProfileDirectory>,
    pub verifier: TokenVerifier,
    /// `None` when no signing secret is configured; deliveries are refused.
    pub webhook: Option<WebhookVerifier>,
    pub options: RouterOptions,
}

#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub cors_origin: String,
    /// Attach error causes to 500 responses.
    pub development: bool,
    pub admin_routes: bool,
}

impl Default for RouterOptions {
    fn default() -> Self {
        RouterOptions {
            cors_origin: "*".to_owned(),
            development: false,
            admin_routes: false,
        }
    }
}
