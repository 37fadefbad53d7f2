//! JWT claims structure for Xornet user sessions.

use serde::{Deserialize, Serialize};

/// Claims embedded in a user session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// JWT ID (unique per token).
    pub jti: String,
    /// Subject (user uuid).
    pub sub: String,
    /// Username at issue time.
    pub username: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiration (unix timestamp). Absent when sessions do not expire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Device context the session was issued to (e.g. a user agent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

impl Claims {
    pub fn user_uuid(&self) -> &str {
        &self.sub
    }
}
