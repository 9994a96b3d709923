use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{error::AppError, subscription::ProfileMetadata, AppState};

pub const NO_TOKEN: &str = "No token provided";
pub const INVALID_TOKEN: &str = "Invalid token";
pub const INVALID_TOKEN_PAYLOAD: &str = "Invalid token payload";

/// Cookie the identity provider's frontend SDK stores the session token in.
pub const SESSION_COOKIE: &str = "__session";

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    pub exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pla: Option<String>,
    #[serde(
        default,
        alias = "public_metadata",
        deserialize_with = "lenient_profile",
        skip_serializing_if = "Option::is_none"
    )]
    pub public_metadata: Option<ProfileMetadata>,
}

/// A metadata claim that is not an object is ignored rather than failing
/// the whole token.
fn lenient_profile<'de, D>(deserializer: D) -> Result<Option<ProfileMetadata>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .and_then(|value| serde_json::from_value(value).ok()))
}

/// The verified caller, attached to request extensions by [`auth`].
#[derive(Debug, Clone)]
pub struct Principal {
    pub subject: String,
    pub plan: Option<String>,
    pub profile: ProfileMetadata,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("no token provided")]
    MissingToken,

    #[error("token rejected: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("verified token has no subject")]
    MissingSubject,
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken => AppError::Unauthorized(NO_TOKEN),
            AuthError::InvalidToken(_) => AppError::Unauthorized(INVALID_TOKEN),
            AuthError::MissingSubject => AppError::Unauthorized(INVALID_TOKEN_PAYLOAD),
        }
    }
}

#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Shared-secret tokens.
    pub fn hs256(secret: &[u8]) -> Self {
        Self::with_key(DecodingKey::from_secret(secret), Algorithm::HS256)
    }

    /// Tokens signed by the identity provider, checked against its PEM
    /// public key without a network round trip.
    pub fn rs256_pem(pem: &[u8]) -> Result<Self, jsonwebtoken::errors::Error> {
        Ok(Self::with_key(DecodingKey::from_rsa_pem(pem)?, Algorithm::RS256))
    }

    fn with_key(key: DecodingKey, algorithm: Algorithm) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.validate_nbf = true;
        TokenVerifier { key, validation }
    }

    pub fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let claims = decode::<TokenClaims>(token, &self.key, &self.validation)?.claims;

        let subject = match claims.sub {
            Some(sub) if !sub.is_empty() => sub,
            _ => return Err(AuthError::MissingSubject),
        };

        Ok(Principal {
            subject,
            plan: claims.pla,
            profile: claims.public_metadata.unwrap_or_default(),
        })
    }
}

fn bearer_token<B>(req: &Request<B>) -> Option<String> {
    let from_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_owned())
        .filter(|token| !token.is_empty());

    from_header.or_else(|| {
        CookieJar::from_headers(req.headers())
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_owned())
            .filter(|token| !token.is_empty())
    })
}

pub async fn auth<B>(
    State(data): State<Arc<AppState>>,
    mut req: Request<B>,
    next: Next<B>,
) -> Result<Response, AppError> {
    let token = bearer_token(&req).ok_or(AuthError::MissingToken)?;

    let principal = match data.verifier.verify(&token) {
        Ok(principal) => principal,
        Err(AuthError::MissingSubject) => {
            warn!("Auth error: verified token carries no subject");
            return Err(AuthError::MissingSubject.into());
        }
        Err(err) => {
            debug!("Auth error: {err}");
            return Err(err.into());
        }
    };

    debug!(user = %principal.subject, "User authenticated");
    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}
