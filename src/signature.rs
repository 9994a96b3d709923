//! Verification of signed webhook deliveries.
//!
//! The sender signs `"{id}.{timestamp}.{body}"` with HMAC-SHA256 under a
//! base64 key published as `whsec_<base64>`, and sends the result as one or
//! more space-separated `v1,<base64 signature>` entries.

use axum::http::HeaderMap;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const ID_HEADER: &str = "svix-id";
pub const TIMESTAMP_HEADER: &str = "svix-timestamp";
pub const SIGNATURE_HEADER: &str = "svix-signature";

const SECRET_PREFIX: &str = "whsec_";
const TOLERANCE_SECS: i64 = 5 * 60;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SignatureError {
    #[error("webhook secret is not valid base64")]
    InvalidSecret,

    #[error("missing signature headers")]
    MissingHeaders,

    #[error("timestamp header is not a number")]
    InvalidTimestamp,

    #[error("timestamp is outside the accepted window")]
    StaleTimestamp,

    #[error("no signature matched")]
    NoMatch,
}

/// The three delivery headers, borrowed from the request.
#[derive(Debug)]
pub struct SignedHeaders<'a> {
    pub id: &'a str,
    pub timestamp: &'a str,
    pub signature: &'a str,
}

impl<'a> SignedHeaders<'a> {
    pub fn from_headers(headers: &'a HeaderMap) -> Result<Self, SignatureError> {
        let get = move |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .filter(|value| !value.is_empty())
                .ok_or(SignatureError::MissingHeaders)
        };
        Ok(SignedHeaders {
            id: get(ID_HEADER)?,
            timestamp: get(TIMESTAMP_HEADER)?,
            signature: get(SIGNATURE_HEADER)?,
        })
    }
}

#[derive(Clone)]
pub struct WebhookVerifier {
    keyed: HmacSha256,
}

impl WebhookVerifier {
    pub fn new(secret: &str) -> Result<Self, SignatureError> {
        let encoded = secret.strip_prefix(SECRET_PREFIX).unwrap_or(secret);
        let key = STANDARD
            .decode(encoded)
            .map_err(|_| SignatureError::InvalidSecret)?;
        let keyed = HmacSha256::new_from_slice(&key).map_err(|_| SignatureError::InvalidSecret)?;
        Ok(WebhookVerifier { keyed })
    }

    fn mac(&self, id: &str, timestamp: &str, body: &[u8]) -> HmacSha256 {
        let mut mac = self.keyed.clone();
        mac.update(id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        mac
    }

    /// `v1,<base64>` signature for a delivery.
    pub fn sign(&self, id: &str, timestamp: i64, body: &[u8]) -> String {
        let digest = self.mac(id, &timestamp.to_string(), body).finalize().into_bytes();
        format!("v1,{}", STANDARD.encode(digest))
    }

    pub fn verify(
        &self,
        headers: &SignedHeaders<'_>,
        body: &[u8],
        now: i64,
    ) -> Result<(), SignatureError> {
        let timestamp: i64 = headers
            .timestamp
            .trim()
            .parse()
            .map_err(|_| SignatureError::InvalidTimestamp)?;
        let skew = now.checked_sub(timestamp).and_then(i64::checked_abs);
        if skew.map_or(true, |skew| skew > TOLERANCE_SECS) {
            return Err(SignatureError::StaleTimestamp);
        }

        let expected = self
            .mac(headers.id, headers.timestamp.trim(), body)
            .finalize()
            .into_bytes();

        let matched = headers
            .signature
            .split_whitespace()
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == "v1")
            .filter_map(|(_, signature)| STANDARD.decode(signature).ok())
            .any(|candidate| bool::from(candidate.as_slice().ct_eq(expected.as_slice())));

        if matched {
            Ok(())
        } else {
            Err(SignatureError::NoMatch)
        }
    }
}
