//! Domain errors surfaced by the fleet core.

use xornet_core::db::DatabaseError;

/// Errors returned by [`FleetManager`](crate::fleet::FleetManager),
/// [`Reaper`](crate::reaper::Reaper) and the token issuer.
///
/// Storage outages always arrive as [`FleetError::StorageUnavailable`] and are
/// never reported as a validation or lookup failure.
#[derive(Debug, thiserror::Error)]
pub enum FleetError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Owner does not exist")]
    InvalidOwner,

    /// Unknown user and wrong password share this variant and message.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    ExpiredToken,

    #[error("User already exists")]
    UserExists,

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FleetError {
    /// Stable machine-readable error kind.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidOwner => "invalid_owner",
            Self::InvalidCredentials => "invalid_credentials",
            Self::InvalidToken => "invalid_token",
            Self::ExpiredToken => "expired_token",
            Self::UserExists => "user_exists",
            Self::DuplicateKey(_) => "duplicate_key",
            Self::NotFound(_) => "not_found",
            Self::StorageUnavailable(_) => "storage_unavailable",
            Self::Internal(_) => "internal",
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

impl From<DatabaseError> for FleetError {
    fn from(e: DatabaseError) -> Self {
        if e.is_unavailable() {
            return Self::StorageUnavailable(e.to_string());
        }
        match e {
            DatabaseError::NotFound(what) => Self::NotFound(what),
            DatabaseError::DuplicateKey(what) => Self::DuplicateKey(what),
            other => Self::StorageUnavailable(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, FleetError>;
