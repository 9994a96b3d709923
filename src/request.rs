use axum::{
    async_trait,
    body::Bytes,
    extract::FromRequest,
    http::Request,
    Json,
};
use chrono::prelude::*;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{Map, Value};

use crate::{
    error::AppError,
    model::{NewNote, NoteChanges, CONTENT_MAX_LENGTH, TAGS_MAX_COUNT, TITLE_MAX_LENGTH},
};

pub const EMPTY_BODY: &str = "Empty JSON body received";
pub const REQUIRED_FIELDS: &str = "Title, content, and date are required";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubscription {
    pub subscription_type: String,
}

/// Payloads that are checked field by field before any handler sees them.
pub trait Validate: Sized {
    fn validate(body: &Map<String, Value>) -> Result<Self, AppError>;
}

/// Extracts and validates a JSON object body, rejecting with the API's
/// error envelope instead of axum's plain-text rejections.
pub struct Validated<T>(pub T);

#[async_trait]
impl<S, B, T> FromRequest<S, B> for Validated<T>
where
    Bytes: FromRequest<S, B>,
    B: Send + 'static,
    S: Send + Sync,
    T: Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request<B>, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|_| AppError::Validation("Unable to read request body".into()))?;
        let body = parse_object(&bytes)?;
        T::validate(&body).map(Validated)
    }
}

/// `Json` with rejections mapped onto the API's error envelope.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, B, T> FromRequest<S, B> for ApiJson<T>
where
    Json<T>: FromRequest<S, B>,
    <Json<T> as FromRequest<S, B>>::Rejection: std::fmt::Display,
    B: Send + 'static,
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request<B>, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(AppError::Validation(rejection.to_string())),
        }
    }
}

fn parse_object(bytes: &[u8]) -> Result<Map<String, Value>, AppError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::Validation(EMPTY_BODY.into()));
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) if map.is_empty() => Err(AppError::Validation(EMPTY_BODY.into())),
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AppError::Validation(
            "Request body must be a JSON object".into(),
        )),
        Err(_) => Err(AppError::Validation("Malformed JSON body".into())),
    }
}

impl Validate for NewNote {
    fn validate(body: &Map<String, Value>) -> Result<Self, AppError> {
        if body.is_empty() {
            return Err(AppError::Validation(EMPTY_BODY.into()));
        }
        let (Some(title), Some(content), Some(date)) = (
            present(body, "title"),
            present(body, "content"),
            present(body, "date"),
        ) else {
            return Err(AppError::Validation(REQUIRED_FIELDS.into()));
        };

        let tags = match body.get("tags") {
            None | Some(Value::Null) => Vec::new(),
            Some(tags) => check_tags(tags)?,
        };

        Ok(NewNote {
            title: check_text(title, "Title", TITLE_MAX_LENGTH)?,
            content: check_text(content, "Content", CONTENT_MAX_LENGTH)?,
            date: check_date(date)?,
            tags,
        })
    }
}

impl Validate for NoteChanges {
    fn validate(body: &Map<String, Value>) -> Result<Self, AppError> {
        if body.is_empty() {
            return Err(AppError::Validation(EMPTY_BODY.into()));
        }
        Ok(NoteChanges {
            title: body
                .get("title")
                .map(|v| check_text(v, "Title", TITLE_MAX_LENGTH))
                .transpose()?,
            content: body
                .get("content")
                .map(|v| check_text(v, "Content", CONTENT_MAX_LENGTH))
                .transpose()?,
            date: body.get("date").map(check_date).transpose()?,
            tags: body.get("tags").map(check_tags).transpose()?,
        })
    }
}

/// Required fields count as missing when absent, null or an empty string.
fn present<'a>(body: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    match body.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(value) => Some(value),
    }
}

fn check_text(value: &Value, field: &str, max: usize) -> Result<String, AppError> {
    let text = match value {
        Value::String(text) if !text.trim().is_empty() => text,
        _ => {
            return Err(AppError::Validation(format!(
                "{field} must be a non-empty string"
            )))
        }
    };
    if text.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(text.clone())
}

fn check_date(value: &Value) -> Result<DateTime<Utc>, AppError> {
    let parsed = match value {
        Value::String(text) => parse_date(text),
        Value::Number(millis) => millis
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    };
    parsed.ok_or_else(|| AppError::Validation("Invalid date format".into()))
}

/// Accepts RFC 3339 timestamps, zone-less date-times (read as UTC) and
/// bare calendar dates (midnight UTC).
pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
        return Some(datetime.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn check_tags(value: &Value) -> Result<Vec<String>, AppError> {
    let Value::Array(items) = value else {
        return Err(AppError::Validation("Tags must be an array".into()));
    };
    if items.len() > TAGS_MAX_COUNT {
        return Err(AppError::Validation(format!(
            "Maximum {TAGS_MAX_COUNT} tags allowed"
        )));
    }
    items
        .iter()
        .map(|item| match item {
            Value::String(tag) if !tag.trim().is_empty() => Ok(tag.clone()),
            _ => Err(AppError::Validation(
                "All tags must be non-empty strings".into(),
            )),
        })
        .collect()
}
