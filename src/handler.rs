use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::Uri,
    response::IntoResponse,
    Extension, Json,
};
use chrono::prelude::*;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::AppError,
    jwt_auth::Principal,
    model::*,
    request::*,
    response::*,
    subscription::{
        apply_subscription_change, has_unrestricted_access, ProfileMetadata, SubscriptionChange,
        SubscriptionTier, FREE_NOTE_LIMIT,
    },
    AppState,
};

fn parse_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|_| AppError::InvalidId)
}

fn not_found() -> AppError {
    AppError::NotFound(NOTE_NOT_FOUND.into())
}

pub async fn health_handler() -> impl IntoResponse {
    Json(json!({ "data": "hello" }))
}

pub async fn fallback_handler(uri: Uri) -> AppError {
    AppError::NotFound(format!("Route {uri} not found"))
}

pub async fn create_note_handler(
    State(data): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Validated(body): Validated<NewNote>,
) -> Result<impl IntoResponse, AppError> {
    info!(
        user = %principal.subject,
        title = %body.title,
        date = %body.date,
        tags = body.tags.len(),
        "Creating note"
    );
    let note = data.notes.create(&principal.subject, body).await?;
    Ok(ApiResponse::created()
        .message(NOTE_CREATED)
        .with("note", json!(note)))
}

pub async fn get_notes_handler(
    State(data): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, AppError> {
    let notes = data.notes.list_by_owner(&principal.subject).await?;
    let count = notes.len();
    Ok(ApiResponse::ok()
        .with("notes", json!(notes))
        .with("count", json!(count)))
}

pub async fn get_note_handler(
    State(data): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let note = data
        .notes
        .get_by_id(&principal.subject, parse_id(&id)?)
        .await?
        .ok_or_else(not_found)?;
    Ok(ApiResponse::ok().with("note", json!(note)))
}

pub async fn update_note_handler(
    State(data): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Validated(changes): Validated<NoteChanges>,
) -> Result<impl IntoResponse, AppError> {
    let note = data
        .notes
        .update(&principal.subject, parse_id(&id)?, &changes)
        .await?
        .ok_or_else(not_found)?;
    Ok(ApiResponse::ok()
        .message(NOTE_UPDATED)
        .with("note", json!(note)))
}

pub async fn delete_note_handler(
    State(data): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    data.notes
        .delete(&principal.subject, parse_id(&id)?)
        .await?
        .ok_or_else(not_found)?;
    Ok(ApiResponse::ok().message(NOTE_DELETED))
}

async fn subscription_report(
    data: &AppState,
    principal: &Principal,
    profile: &ProfileMetadata,
) -> Result<ApiResponse, AppError> {
    let note_count = data.notes.count_by_owner(&principal.subject).await?;
    let unrestricted = has_unrestricted_access(principal.plan.as_deref(), profile, Utc::now());
    let note_limit = (!unrestricted).then_some(FREE_NOTE_LIMIT);
    Ok(ApiResponse::ok().with(
        "data",
        json!({
            "userId": principal.subject,
            "subscriptionTier": profile.tier(),
            "isCanceled": profile.is_canceled(),
            "subscriptionStartDate": profile.subscription_start_date,
            "subscriptionEndDate": profile.subscription_end_date,
            "plan": principal.plan,
            "hasUnrestrictedAccess": unrestricted,
            "noteCount": note_count,
            "noteLimit": note_limit,
        }),
    ))
}

async fn stored_profile(data: &AppState, user_id: &str) -> Result<ProfileMetadata, AppError> {
    let bag = data.directory.public_metadata(user_id).await?;
    ProfileMetadata::from_bag(&bag)
        .map_err(|err| AppError::Internal(format!("Profile metadata is malformed: {err}")))
}

pub async fn check_subscription_handler(
    State(data): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, AppError> {
    let profile = stored_profile(&data, &principal.subject).await?;
    subscription_report(&data, &principal, &profile).await
}

pub async fn update_subscription_handler(
    State(data): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    ApiJson(body): ApiJson<UpdateSubscription>,
) -> Result<impl IntoResponse, AppError> {
    let now = Utc::now();
    let change = match body.subscription_type.as_str() {
        "premium" => SubscriptionChange::Activate {
            start: now,
            end: None,
        },
        "free" => SubscriptionChange::Downgrade,
        _ => {
            return Err(AppError::BadRequest(
                "subscriptionType must be 'premium' or 'free'".into(),
            ))
        }
    };

    info!(user = %principal.subject, ?change, "Manual subscription update");
    let profile =
        apply_subscription_change(data.directory.as_ref(), &principal.subject, &change, now).await?;
    subscription_report(&data, &principal, &profile).await
}

pub async fn cancel_subscription_handler(
    State(data): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, AppError> {
    let current = stored_profile(&data, &principal.subject).await?;
    if current.tier() != SubscriptionTier::Premium {
        return Err(AppError::BadRequest(
            "No active premium subscription to cancel".into(),
        ));
    }

    info!(user = %principal.subject, "Manual subscription cancel");
    let profile = apply_subscription_change(
        data.directory.as_ref(),
        &principal.subject,
        &SubscriptionChange::Cancel { end: None },
        Utc::now(),
    )
    .await?;
    subscription_report(&data, &principal, &profile).await
}
