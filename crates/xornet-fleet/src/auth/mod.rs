//! Authentication module for the Xornet fleet backend.
//!
//! Provides machine access tokens, signed user session tokens, and password
//! hashing.

pub mod claims;
pub mod issuer;
pub mod password;

pub use claims::Claims;
pub use issuer::{SessionToken, TokenIssuer};
