use std::path::PathBuf;

use prodtrack_core::{Organization, UserId};
use prodtrack_crypto::CryptoError;
use thiserror::Error;

/// Identity store failures.
#[derive(Error, Debug)]
pub enum WalletError {
    /// No identity stored for the key.
    #[error("no identity for {user} in {org}")]
    NotFound { org: Organization, user: UserId },

    /// `put_new` found an identity already stored for the key.
    #[error("identity for {user} in {org} already exists")]
    AlreadyExists { org: Organization, user: UserId },

    /// The record is internally inconsistent (certificate does not match
    /// the key, the organization, or the user).
    #[error("invalid identity record: {0}")]
    InvalidRecord(String),

    /// A stored file could not be parsed.
    #[error("corrupt identity file {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// Filesystem failure.
    #[error("keystore io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Key or certificate material could not be decoded.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
