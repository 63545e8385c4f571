use anyhow::anyhow;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::debug;

use messagely_types::api::Claims;

use crate::error::ApiError;

/// 30 days.
pub const DEFAULT_TTL_HOURS: i64 = 720;

/// Mints and verifies HS256 session tokens. Nothing is recorded server-side:
/// a token is valid exactly when its signature checks out and it has not
/// expired, so there is no revocation.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
            ttl,
        }
    }

    pub fn issue(&self, username: &str) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            sub: username.to_string(),
            iat: now.timestamp() as usize,
            exp: (now + self.ttl).timestamp() as usize,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(anyhow!("token signing failed: {}", e)))
    }

    /// Map a token back to the username it was issued to.
    pub fn verify(&self, token: &str) -> Result<String, ApiError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            debug!("Rejected session token: {}", e);
            ApiError::Unauthorized
        })?;
        Ok(data.claims.sub)
    }
}
