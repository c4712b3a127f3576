use thiserror::Error;

/// Error in cryptographic operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Signature verification failed.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),

    /// Key parsing failed.
    #[error("key error: {0}")]
    KeyError(String),

    /// PEM or base64 armour could not be decoded.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Certificate body is malformed.
    #[error("certificate error: {0}")]
    Certificate(String),
}
