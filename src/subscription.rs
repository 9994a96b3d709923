use std::{fmt, sync::Arc};

use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use chrono::{prelude::*, Duration};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::{
    error::AppError,
    identity::{IdentityError, ProfileDirectory},
    jwt_auth::Principal,
    AppState,
};

pub const FREE_NOTE_LIMIT: i64 = 10;
pub const LIMIT_REACHED: &str = "Note limit reached. Upgrade to Premium for unlimited notes.";
pub const DEFAULT_PERIOD_DAYS: i64 = 30;

const LEGACY_PREMIUM_PLAN: &str = "premium";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum SubscriptionTier {
    Free,
    Premium,
}

impl From<String> for SubscriptionTier {
    fn from(value: String) -> Self {
        if value.eq_ignore_ascii_case("premium") {
            SubscriptionTier::Premium
        } else {
            SubscriptionTier::Free
        }
    }
}

impl SubscriptionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Premium => "premium",
        }
    }
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed view over the identity provider's public metadata bag.
///
/// Older records only carry the `subscription` key; `subscriptionTier`
/// wins when both are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileMetadata {
    #[serde(
        default,
        deserialize_with = "lenient_tier",
        skip_serializing_if = "Option::is_none"
    )]
    pub subscription_tier: Option<SubscriptionTier>,
    #[serde(
        default,
        rename = "subscription",
        deserialize_with = "lenient_tier",
        skip_serializing_if = "Option::is_none"
    )]
    pub legacy_subscription: Option<SubscriptionTier>,
    #[serde(
        default,
        deserialize_with = "lenient_bool",
        skip_serializing_if = "Option::is_none"
    )]
    pub is_canceled: Option<bool>,
    #[serde(
        default,
        deserialize_with = "lenient_datetime",
        skip_serializing_if = "Option::is_none"
    )]
    pub subscription_start_date: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "lenient_datetime",
        skip_serializing_if = "Option::is_none"
    )]
    pub subscription_end_date: Option<DateTime<Utc>>,
}

impl ProfileMetadata {
    pub fn from_bag(bag: &Map<String, Value>) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(bag.clone()))
    }

    pub fn tier(&self) -> SubscriptionTier {
        self.subscription_tier
            .or(self.legacy_subscription)
            .unwrap_or(SubscriptionTier::Free)
    }

    pub fn is_canceled(&self) -> bool {
        self.is_canceled.unwrap_or(false)
    }
}

// Fields of the provider-owned bag that hold the wrong type read as absent.

fn lenient_tier<'de, D>(deserializer: D) -> Result<Option<SubscriptionTier>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => Some(SubscriptionTier::from(text)),
        _ => None,
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(flag)) => Some(flag),
        Some(Value::String(text)) => text.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => DateTime::parse_from_rfc3339(&text)
            .ok()
            .map(|datetime| datetime.with_timezone(&Utc)),
        Some(Value::Number(number)) => number.as_i64().and_then(timestamp_to_datetime),
        _ => None,
    })
}

/// Unix timestamp in seconds, or milliseconds once it is too large to be a
/// plausible seconds value.
pub fn timestamp_to_datetime(timestamp: i64) -> Option<DateTime<Utc>> {
    if timestamp.abs() >= 100_000_000_000 {
        Utc.timestamp_millis_opt(timestamp).single()
    } else {
        Utc.timestamp_opt(timestamp, 0).single()
    }
}

fn is_legacy_premium(plan: Option<&str>) -> bool {
    plan.map(|plan| plan.strip_prefix("u:").unwrap_or(plan))
        .map_or(false, |plan| plan.eq_ignore_ascii_case(LEGACY_PREMIUM_PLAN))
}

/// Whether the caller may create notes beyond the free limit.
///
/// The legacy plan attribute wins outright. Otherwise a premium tier holds
/// until its end date passes; premium records without an end date never
/// expire.
pub fn has_unrestricted_access(
    plan: Option<&str>,
    profile: &ProfileMetadata,
    now: DateTime<Utc>,
) -> bool {
    if is_legacy_premium(plan) {
        return true;
    }
    match profile.tier() {
        SubscriptionTier::Premium => match profile.subscription_end_date {
            Some(end) => now < end,
            None => true,
        },
        SubscriptionTier::Free => false,
    }
}

/// Runs before note creation: unrestricted callers pass, everyone else is
/// held to [`FREE_NOTE_LIMIT`].
pub async fn note_quota<B>(
    State(data): State<Arc<AppState>>,
    req: Request<B>,
    next: Next<B>,
) -> Result<Response, AppError> {
    let principal = req
        .extensions()
        .get::<Principal>()
        .cloned()
        .ok_or(AppError::Unauthorized(crate::jwt_auth::INVALID_TOKEN))?;

    if has_unrestricted_access(principal.plan.as_deref(), &principal.profile, Utc::now()) {
        return Ok(next.run(req).await);
    }

    let count = data.notes.count_by_owner(&principal.subject).await?;
    if count >= FREE_NOTE_LIMIT {
        info!(user = %principal.subject, count, "Free note limit reached");
        return Err(AppError::Forbidden(LIMIT_REACHED.into()));
    }

    Ok(next.run(req).await)
}

/// A write to a user's subscription attributes.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionChange {
    Activate {
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    },
    Downgrade,
    /// Keeps the tier; access lapses at `end`, the stored end date, or now.
    Cancel { end: Option<DateTime<Utc>> },
}

impl SubscriptionChange {
    fn patch(&self, bag: &Map<String, Value>, now: DateTime<Utc>) -> Map<String, Value> {
        let mut patch = Map::new();
        match self {
            SubscriptionChange::Activate { start, end } => {
                let end = end.unwrap_or(*start + Duration::days(DEFAULT_PERIOD_DAYS));
                set_tier(&mut patch, SubscriptionTier::Premium);
                patch.insert("subscriptionStartDate".into(), start.to_rfc3339().into());
                patch.insert("subscriptionEndDate".into(), end.to_rfc3339().into());
                patch.insert("isCanceled".into(), false.into());
            }
            SubscriptionChange::Downgrade => {
                set_tier(&mut patch, SubscriptionTier::Free);
                patch.insert("subscriptionStartDate".into(), Value::Null);
                patch.insert("subscriptionEndDate".into(), Value::Null);
                patch.insert("isCanceled".into(), false.into());
            }
            SubscriptionChange::Cancel { end } => {
                let stored = || {
                    ProfileMetadata::from_bag(bag)
                        .ok()
                        .and_then(|current| current.subscription_end_date)
                };
                let end = end.or_else(stored).unwrap_or(now);
                patch.insert("subscriptionEndDate".into(), end.to_rfc3339().into());
                patch.insert("isCanceled".into(), true.into());
            }
        }
        patch
    }
}

fn set_tier(patch: &mut Map<String, Value>, tier: SubscriptionTier) {
    patch.insert("subscriptionTier".into(), tier.as_str().into());
    patch.insert("subscription".into(), tier.as_str().into());
}

/// Reads the user's metadata, merges the change over it and writes the whole
/// bag back, so keys this system does not own survive.
pub async fn apply_subscription_change(
    directory: &dyn ProfileDirectory,
    user_id: &str,
    change: &SubscriptionChange,
    now: DateTime<Utc>,
) -> Result<ProfileMetadata, IdentityError> {
    let mut bag = directory.public_metadata(user_id).await?;

    let patch = change.patch(&bag, now);
    bag.extend(patch);
    debug!(user = user_id, ?change, "Writing subscription metadata");
    directory.replace_public_metadata(user_id, bag.clone()).await?;

    ProfileMetadata::from_bag(&bag).map_err(IdentityError::InvalidMetadata)
}
