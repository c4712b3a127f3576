//! Session error types.

use prodtrack_core::{Organization, UserId};
use prodtrack_wallet::WalletError;

/// Failure to prove possession of an enrolled identity.
///
/// Callers should collapse the variants into one generic message before
/// showing them to a client.
#[derive(Debug, thiserror::Error)]
pub enum AuthFailure {
    /// No identity is stored for the user in the organization.
    #[error("user {user} is not registered in {org}")]
    NotRegistered { org: Organization, user: UserId },

    /// The submitted key does not match the stored one.
    #[error("submitted key does not match the stored identity")]
    KeyMismatch,

    /// The token could not be issued.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// The identity store could not be read.
    #[error(transparent)]
    Store(#[from] WalletError),
}

/// A session token could not be accepted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Signature and claims are fine but the expiry instant has passed.
    #[error("session token expired at {expired_at}")]
    Expired { expired_at: i64 },

    /// Malformed, tampered with, or signed by another key.
    #[error("invalid session token: {0}")]
    Invalid(String),
}
