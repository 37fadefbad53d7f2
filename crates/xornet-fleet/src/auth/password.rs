//! Password hashing and verification using argon2id.

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

use crate::error::{FleetError, Result};

/// Well-formed argon2id hash that matches no password. Verifying against it
/// costs the same as a real check, so unknown usernames take as long to
/// reject as wrong passwords.
const DECOY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Hash a password using argon2id with a random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| FleetError::Internal(format!("Password hashing failed: {e}")))?;
    Ok(hash.to_string())
}

/// Check a password against a stored argon2id hash.
///
/// A mismatch and an unparseable stored hash both yield
/// [`FleetError::InvalidCredentials`].
pub fn check_password(password: &str, hash: &str) -> Result<()> {
    let parsed = PasswordHash::new(hash).map_err(|_| FleetError::InvalidCredentials)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| FleetError::InvalidCredentials)
}

/// Spend one verification's worth of work and fail.
pub fn reject_unknown_user(password: &str) -> FleetError {
    let _ = check_password(password, DECOY_HASH);
    FleetError::InvalidCredentials
}
