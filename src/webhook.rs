use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
};
use chrono::prelude::*;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    error::AppError,
    response::ApiResponse,
    signature::SignedHeaders,
    subscription::{apply_subscription_change, timestamp_to_datetime, SubscriptionChange},
    AppState,
};

pub const SECRET_NOT_CONFIGURED: &str = "Webhook secret not configured";
pub const MISSING_HEADERS: &str = "Missing svix headers";
pub const VERIFICATION_FAILED: &str = "Error verifying webhook";
pub const PROCESSING_FAILED: &str = "Webhook processing failed";
pub const PROCESSED: &str = "Webhook processed successfully";

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct Payer {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionData {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub payer: Option<Payer>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub plan: Option<Plan>,
    #[serde(default)]
    pub current_period_start: Option<i64>,
    #[serde(default)]
    pub current_period_end: Option<i64>,
}

impl SubscriptionData {
    fn user_id(&self) -> Option<&str> {
        self.user_id
            .as_deref()
            .or_else(|| self.payer.as_ref().and_then(|payer| payer.user_id.as_deref()))
            .filter(|id| !id.is_empty())
    }

    fn plan_is(&self, name: &str) -> bool {
        self.plan
            .as_ref()
            .and_then(|plan| plan.name.as_deref())
            .map_or(false, |plan| plan.eq_ignore_ascii_case(name))
    }

    fn period_start(&self) -> Option<DateTime<Utc>> {
        self.current_period_start.and_then(timestamp_to_datetime)
    }

    fn period_end(&self) -> Option<DateTime<Utc>> {
        self.current_period_end.and_then(timestamp_to_datetime)
    }
}

#[derive(Debug, PartialEq)]
pub enum Reconciliation {
    Apply {
        user_id: String,
        change: SubscriptionChange,
    },
    Ignore,
}

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("event data is malformed: {0}")]
    MalformedData(#[from] serde_json::Error),

    #[error("event carries no user id")]
    MissingUser,
}

/// Maps a billing lifecycle event onto the profile write it calls for.
pub fn reconcile(event: &WebhookEvent, now: DateTime<Utc>) -> Result<Reconciliation, ReconcileError> {
    let kind = event.kind.as_str();
    if !matches!(
        kind,
        "subscription.created"
            | "subscription.updated"
            | "subscription.canceled"
            | "subscription.past_due"
            | "subscription.incomplete"
            | "subscription.deleted"
    ) {
        return Ok(Reconciliation::Ignore);
    }

    let data: SubscriptionData = if event.data.is_null() {
        SubscriptionData::default()
    } else {
        serde_json::from_value(event.data.clone())?
    };
    let user_id = data.user_id().ok_or(ReconcileError::MissingUser)?.to_owned();

    let change = match kind {
        "subscription.created" | "subscription.updated" => status_change(&data, now),
        "subscription.canceled" => SubscriptionChange::Cancel {
            end: data.period_end(),
        },
        _ => SubscriptionChange::Downgrade,
    };

    Ok(Reconciliation::Apply { user_id, change })
}

fn status_change(data: &SubscriptionData, now: DateTime<Utc>) -> SubscriptionChange {
    match data.status.as_deref() {
        Some("active") if data.plan_is("Premium") => SubscriptionChange::Activate {
            start: data.period_start().unwrap_or(now),
            end: data.period_end(),
        },
        Some("canceled") => SubscriptionChange::Cancel {
            end: data.period_end(),
        },
        _ => SubscriptionChange::Downgrade,
    }
}

pub async fn clerk_webhook_handler(
    State(data): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let Some(verifier) = data.webhook.as_ref() else {
        error!("Webhook received but no signing secret is configured");
        return Err(AppError::BadRequest(SECRET_NOT_CONFIGURED.into()));
    };

    let signed = SignedHeaders::from_headers(&headers)
        .map_err(|_| AppError::BadRequest(MISSING_HEADERS.into()))?;

    if let Err(err) = verifier.verify(&signed, &body, Utc::now().timestamp()) {
        warn!(id = signed.id, "Error verifying webhook: {err}");
        return Err(AppError::BadRequest(VERIFICATION_FAILED.into()));
    }

    let event: WebhookEvent = serde_json::from_slice(&body).map_err(|err| {
        error!("Webhook payload is not an event: {err}");
        AppError::BadRequest(PROCESSING_FAILED.into())
    })?;
    info!(kind = %event.kind, "Webhook received");

    let now = Utc::now();
    match reconcile(&event, now) {
        Ok(Reconciliation::Apply { user_id, change }) => {
            let profile = apply_subscription_change(data.directory.as_ref(), &user_id, &change, now)
                .await
                .map_err(|err| {
                    error!(user = %user_id, "Error reconciling subscription: {err}");
                    AppError::BadRequest(PROCESSING_FAILED.into())
                })?;
            info!(
                user = %user_id,
                tier = %profile.tier(),
                canceled = profile.is_canceled(),
                "Subscription reconciled"
            );
        }
        Ok(Reconciliation::Ignore) => info!(kind = %event.kind, "Unhandled webhook type"),
        Err(err) => {
            error!(kind = %event.kind, "Error handling webhook: {err}");
            return Err(AppError::BadRequest(PROCESSING_FAILED.into()));
        }
    }

    Ok(ApiResponse::ok().message(PROCESSED))
}
