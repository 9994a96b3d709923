use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{Map, Value};

pub const NOTE_CREATED: &str = "Note created successfully";
pub const NOTE_UPDATED: &str = "Note updated successfully";
pub const NOTE_DELETED: &str = "Note deleted successfully";
pub const NOTE_NOT_FOUND: &str = "Note not found";

/// Success envelope: `{ "success": true, "message"?: …, ...data }`, with the
/// data keys merged into the top level.
#[derive(Debug)]
pub struct ApiResponse {
    status: StatusCode,
    message: Option<&'static str>,
    data: Map<String, Value>,
}

impl ApiResponse {
    pub fn ok() -> Self {
        ApiResponse {
            status: StatusCode::OK,
            message: None,
            data: Map::new(),
        }
    }

    pub fn created() -> Self {
        ApiResponse {
            status: StatusCode::CREATED,
            ..Self::ok()
        }
    }

    pub fn message(mut self, message: &'static str) -> Self {
        self.message = Some(message);
        self
    }

    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.data.insert(key.to_owned(), value);
        self
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        let mut body = Map::new();
        body.insert("success".into(), Value::Bool(true));
        if let Some(message) = self.message {
            body.insert("message".into(), message.into());
        }
        body.extend(self.data);
        (self.status, Json(Value::Object(body))).into_response()
    }
}
