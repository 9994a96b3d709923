use std::{env, fmt::Display, str::FromStr};

use thiserror::Error;
use tracing::info;

use crate::identity::{ClerkConfig, DEFAULT_CLERK_API_URL};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid {key} value: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("Either CLERK_JWT_KEY or JWT_SECRET must be set")]
    MissingTokenKey,
}

/// How bearer tokens are verified.
#[derive(Debug, Clone)]
pub enum TokenKey {
    /// PEM public key, RS256.
    PublicKey(String),
    /// Shared secret, HS256.
    Secret(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub port: u16,
    pub cors_origin: String,
    pub development: bool,
    pub admin_routes: bool,
    pub token_key: TokenKey,
    pub clerk: ClerkConfig,
    pub webhook_secret: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let token_key = match (optional("CLERK_JWT_KEY"), optional("JWT_SECRET")) {
            (Some(pem), _) => TokenKey::PublicKey(pem.replace("\\n", "\n")),
            (None, Some(secret)) => TokenKey::Secret(secret),
            (None, None) => return Err(ConfigError::MissingTokenKey),
        };

        Ok(Config {
            database_url: required("DATABASE_URL")?,
            max_connections: try_load("DATABASE_MAX_CONNECTIONS", "10")?,
            port: try_load("PORT", "8000")?,
            cors_origin: optional("CORS_ORIGIN").unwrap_or_else(|| "*".to_owned()),
            development: optional("APP_ENV").map_or(false, |v| v.eq_ignore_ascii_case("development")),
            admin_routes: try_load("ENABLE_ADMIN_ROUTES", "false")?,
            token_key,
            clerk: clerk_from_env()?,
            webhook_secret: optional("CLERK_WEBHOOK_SECRET"),
        })
    }
}

pub fn clerk_from_env() -> Result<ClerkConfig, ConfigError> {
    Ok(ClerkConfig {
        secret_key: required("CLERK_SECRET_KEY")?,
        api_url: optional("CLERK_API_URL").unwrap_or_else(|| DEFAULT_CLERK_API_URL.to_owned()),
    })
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    optional(key).ok_or(ConfigError::Missing(key))
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    optional(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_owned()
        })
        .parse()
        .map_err(|e: T::Err| ConfigError::Invalid {
            key,
            message: e.to_string(),
        })
}
