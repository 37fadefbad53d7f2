//! Machine access tokens and user session tokens.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;

use xornet_core::db::unix_timestamp;

use super::claims::Claims;
use crate::error::{FleetError, Result};

/// Length of a machine access token in hex characters.
pub const MACHINE_TOKEN_LEN: usize = 128;

/// A signed session token handed to a user after signup or login.
#[derive(Debug, Clone, Serialize)]
pub struct SessionToken {
    pub token: String,
    /// Unix timestamp after which the token is rejected, if it expires.
    pub expires_at: Option<i64>,
}

/// Issues opaque machine access tokens and signs/verifies session tokens.
///
/// The signing key is fixed for the life of the process; changing it
/// invalidates every outstanding session.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    session_ttl_secs: Option<i64>,
}

impl TokenIssuer {
    /// Create a new `TokenIssuer` with the given secret.
    ///
    /// `session_ttl_secs = None` issues sessions without an expiry claim.
    pub fn new(secret: &[u8], session_ttl_secs: Option<i64>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            session_ttl_secs,
        }
    }

    /// Generate a machine access token: four random v4 UUIDs, hyphens
    /// stripped, concatenated into 128 lowercase hex characters.
    ///
    /// The `uuid` crate fills v4 identifiers from the operating system RNG.
    pub fn issue_machine_token(&self) -> String {
        let mut token = String::with_capacity(MACHINE_TOKEN_LEN);
        for _ in 0..4 {
            token.push_str(&uuid::Uuid::new_v4().simple().to_string());
        }
        token
    }

    /// Sign a session token for the given user.
    pub fn issue_session_token(
        &self,
        user_uuid: &str,
        username: &str,
        device: Option<&str>,
    ) -> Result<SessionToken> {
        let now = unix_timestamp();
        let exp = self.session_ttl_secs.map(|ttl| now + ttl);

        let claims = Claims {
            jti: uuid::Uuid::new_v4().to_string(),
            sub: user_uuid.to_string(),
            username: username.to_string(),
            iat: now,
            exp,
            device: device.map(str::to_string),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| FleetError::Internal(format!("Token creation failed: {e}")))?;

        Ok(SessionToken {
            token,
            expires_at: exp,
        })
    }

    /// Verify a session token's signature and expiry and return its claims.
    pub fn verify_session_token(&self, token: &str) -> Result<Claims> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation())
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => FleetError::ExpiredToken,
                _ => FleetError::InvalidToken,
            })?;
        Ok(data.claims)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        if self.session_ttl_secs.is_some() {
            validation.validate_exp = true;
            validation.set_required_spec_claims(&["exp", "sub"]);
        } else {
            validation.validate_exp = false;
            validation.set_required_spec_claims(&["sub"]);
        }
        validation
    }
}
