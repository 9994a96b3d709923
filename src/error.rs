use axum::{
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::{identity::IdentityError, store::StoreError};

pub const INTERNAL_MESSAGE: &str = "Something went wrong";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid ID format")]
    InvalidId,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Identity provider error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidId | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Store(_) | AppError::Identity(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Underlying cause of a 500, kept on the response so development builds can
/// surface it without handlers knowing about the runtime mode.
#[derive(Clone, Debug)]
pub struct ErrorDetails(pub String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {self}");
            let mut response = (
                status,
                Json(json!({ "error": true, "message": INTERNAL_MESSAGE })),
            )
                .into_response();
            response
                .extensions_mut()
                .insert(ErrorDetails(self.to_string()));
            return response;
        }

        (
            status,
            Json(json!({ "error": true, "message": self.to_string() })),
        )
            .into_response()
    }
}

/// Rewrites 500 bodies to carry `details`. Only mounted in development.
pub async fn expose_error_details<B>(req: Request<B>, next: Next<B>) -> Response {
    let response = next.run(req).await;

    match response.extensions().get::<ErrorDetails>() {
        Some(ErrorDetails(details)) => (
            response.status(),
            Json(json!({
                "error": true,
                "message": INTERNAL_MESSAGE,
                "details": details,
            })),
        )
            .into_response(),
        None => response,
    }
}
