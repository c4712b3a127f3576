//! Enrollment error types.

use prodtrack_core::{Organization, UserId};
use prodtrack_crypto::CryptoError;
use prodtrack_wallet::WalletError;

/// Errors from enrollment-authority calls and the enrollment workflow.
///
/// None of these are retried inside this crate.
#[derive(Debug, thiserror::Error)]
pub enum EnrollmentError {
    /// An identity for the user already exists in the organization's store.
    #[error("User Already Exists! ({user} in {org})")]
    AlreadyRegistered { org: Organization, user: UserId },

    /// No administrative identity is enrolled for the organization.
    #[error("An identity for the admin user does not exist in the {org} wallet. Enroll the admin user before retrying")]
    AdminRequired { org: Organization },

    /// No authority is configured for the organization.
    #[error("no enrollment authority configured for {0}")]
    UnknownAuthority(Organization),

    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },

    /// The authority rejected the request.
    #[error("enrollment authority {endpoint} returned {status}: {message}")]
    Authority {
        endpoint: String,
        status: u16,
        message: String,
    },

    /// Response body could not be decoded.
    #[error("failed to decode response from {endpoint}: {reason}")]
    Deserialization { endpoint: String, reason: String },

    /// The issued certificate does not match the request.
    #[error("authority issued an unusable certificate: {0}")]
    InvalidCertificate(String),

    /// Identity store failure.
    #[error(transparent)]
    Store(#[from] WalletError),

    /// Key material error.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}
