//! # Ledger Gateway Errors
//!
//! - [`ConnectError`]: no connection could be bound for the caller. Maps to
//!   503 at the HTTP boundary; the caller may retry.
//! - [`TxnError`]: a submitted transaction failed. Never retried here.
//! - [`QueryError`]: an evaluation failed. Transport failures were already
//!   retried by the gateway before this surfaces.
//! - [`ContractError`]: the contract itself rejected the call, with one of
//!   the wire [`ErrorCode`]s.

use serde::{Deserialize, Serialize};

use prodtrack_core::{Organization, UserId, ValidationError};
use prodtrack_crypto::CryptoError;
use prodtrack_state::LifecycleViolation;
use prodtrack_wallet::WalletError;

/// Machine-readable rejection reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    AccessDenied,
    Conflict,
    InvalidTransition,
    BadRequest,
    Unauthorized,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::AccessDenied => "ACCESS_DENIED",
            Self::Conflict => "CONFLICT",
            Self::InvalidTransition => "INVALID_TRANSITION",
            Self::BadRequest => "BAD_REQUEST",
            Self::Unauthorized => "UNAUTHORIZED",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejection raised by the product contract.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ContractError {
    pub code: ErrorCode,
    pub message: String,
}

impl ContractError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AccessDenied, message)
    }
}

impl From<LifecycleViolation> for ContractError {
    fn from(v: LifecycleViolation) -> Self {
        let code = if v.is_access_denial() {
            ErrorCode::AccessDenied
        } else {
            ErrorCode::InvalidTransition
        };
        Self::new(code, v.to_string())
    }
}

impl From<ValidationError> for ContractError {
    fn from(e: ValidationError) -> Self {
        Self::bad_request(e.to_string())
    }
}

/// A connection could not be established for the caller.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// No gateway endpoint is configured for the organization.
    #[error("no ledger gateway configured for {0}")]
    UnknownOrganization(Organization),

    /// The caller has no identity in the store.
    #[error("An identity for the user {user} does not exist in the {org} wallet")]
    IdentityNotFound { org: Organization, user: UserId },

    /// The identity store failed.
    #[error(transparent)]
    Store(WalletError),

    /// The stored key material is unusable.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// The HTTP client could not be built.
    #[error("failed to initialise gateway client: {0}")]
    Client(#[source] reqwest::Error),
}

impl From<WalletError> for ConnectError {
    fn from(e: WalletError) -> Self {
        match e {
            WalletError::NotFound { org, user } => Self::IdentityNotFound { org, user },
            WalletError::Crypto(e) => Self::Crypto(e),
            other => Self::Store(other),
        }
    }
}

/// A submitted transaction failed.
#[derive(Debug, thiserror::Error)]
pub enum TxnError {
    /// The contract rejected the transaction.
    #[error("{0}")]
    Rejected(#[from] ContractError),

    /// Transport failure before a response arrived.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The gateway answered with an error it did not explain.
    #[error("ledger gateway {endpoint} returned {status}: {body}")]
    Gateway {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// The response could not be decoded.
    #[error("failed to decode response from {endpoint}: {reason}")]
    Deserialization { endpoint: String, reason: String },
}

impl TxnError {
    /// The contract's rejection code, if the contract rejected the call.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Rejected(e) => Some(e.code),
            _ => None,
        }
    }
}

/// An evaluated query failed.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The contract rejected the query.
    #[error("{0}")]
    Rejected(#[from] ContractError),

    /// Transport failure after all retries.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The gateway answered with an error it did not explain.
    #[error("ledger gateway {endpoint} returned {status}: {body}")]
    Gateway {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// The response could not be decoded.
    #[error("failed to decode response from {endpoint}: {reason}")]
    Deserialization { endpoint: String, reason: String },
}

impl QueryError {
    /// The contract's rejection code, if the contract rejected the query.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Rejected(e) => Some(e.code),
            _ => None,
        }
    }

    /// Whether the queried record does not exist.
    pub fn is_not_found(&self) -> bool {
        self.code() == Some(ErrorCode::NotFound)
    }
}
