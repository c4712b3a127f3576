//! # API Error Types
//!
//! Every failure renders the same envelope:
//!
//! ```json
//! { "success": false, "message": "...", "error": { "code": "NOT_FOUND", "message": "..." } }
//! ```
//!
//! Domain errors reach the client verbatim, except authentication failures
//! (one generic message) and internal errors (logged, never returned).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use prodtrack_ca_client::EnrollmentError;
use prodtrack_core::ValidationError;
use prodtrack_ledger::{ConnectError, ErrorCode};
use prodtrack_lifecycle::LifecycleError;
use prodtrack_session::{AuthFailure, TokenError};

const INVALID_CREDENTIALS: &str = "Invalid username, organization or private key";

/// Failure response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable code, e.g. `"INVALID_TRANSITION"`.
    pub code: String,
    pub message: String,
}

/// Application-level error type that implements [`IntoResponse`].
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    /// The caller's organization or identity may not perform the action.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// The product's current state does not allow the action.
    #[error("{0}")]
    InvalidTransition(String),

    /// The ledger gateway or enrollment authority failed.
    #[error("{0}")]
    Upstream(String),

    /// No ledger connection could be bound; the caller may retry.
    #[error("{0}")]
    ServiceUnavailable(String),

    /// Logged, never returned to the client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status and machine-readable code.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "ACCESS_DENIED"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::InvalidTransition(_) => (StatusCode::CONFLICT, "INVALID_TRANSITION"),
            Self::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            Self::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// Prefix the client-visible message, e.g. with the failing action.
    pub fn context(self, prefix: impl std::fmt::Display) -> Self {
        let wrap = |m: String| format!("{prefix}: {m}");
        match self {
            Self::BadRequest(m) => Self::BadRequest(wrap(m)),
            Self::Forbidden(m) => Self::Forbidden(wrap(m)),
            Self::NotFound(m) => Self::NotFound(wrap(m)),
            Self::Conflict(m) => Self::Conflict(wrap(m)),
            Self::InvalidTransition(m) => Self::InvalidTransition(wrap(m)),
            Self::Upstream(m) => Self::Upstream(wrap(m)),
            Self::ServiceUnavailable(m) => Self::ServiceUnavailable(wrap(m)),
            other => other,
        }
    }

    fn from_code(code: ErrorCode, message: String) -> Self {
        match code {
            ErrorCode::NotFound => Self::NotFound(message),
            ErrorCode::AccessDenied => Self::Forbidden(message),
            ErrorCode::Conflict => Self::Conflict(message),
            ErrorCode::InvalidTransition => Self::InvalidTransition(message),
            ErrorCode::BadRequest => Self::BadRequest(message),
            ErrorCode::Unauthorized => Self::Unauthorized(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::Upstream(_) => tracing::error!(error = %self, "upstream error"),
            Self::ServiceUnavailable(_) => tracing::warn!(error = %self, "service unavailable"),
            _ => tracing::debug!(error = %self, code, "request failed"),
        }

        let body = ErrorBody {
            success: false,
            message: message.clone(),
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<EnrollmentError> for AppError {
    fn from(err: EnrollmentError) -> Self {
        match err {
            EnrollmentError::AlreadyRegistered { .. } => Self::Conflict(err.to_string()),
            EnrollmentError::AdminRequired { .. } | EnrollmentError::UnknownAuthority(_) => {
                Self::ServiceUnavailable(err.to_string())
            }
            EnrollmentError::Http { .. }
            | EnrollmentError::Authority { .. }
            | EnrollmentError::Deserialization { .. }
            | EnrollmentError::InvalidCertificate(_) => Self::Upstream(err.to_string()),
            EnrollmentError::Store(_) | EnrollmentError::Crypto(_) | EnrollmentError::Config(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<AuthFailure> for AppError {
    fn from(err: AuthFailure) -> Self {
        match err {
            AuthFailure::Store(e) => Self::Internal(e.to_string()),
            AuthFailure::Token(e) => Self::Internal(e.to_string()),
            AuthFailure::NotRegistered { .. } | AuthFailure::KeyMismatch => {
                Self::Unauthorized(INVALID_CREDENTIALS.to_string())
            }
        }
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired { .. } => Self::Unauthorized("session token expired".to_string()),
            TokenError::Invalid(_) => Self::Unauthorized("invalid session token".to_string()),
        }
    }
}

impl From<ConnectError> for AppError {
    fn from(err: ConnectError) -> Self {
        match err {
            ConnectError::Store(_) | ConnectError::Crypto(_) => Self::Internal(err.to_string()),
            other => Self::ServiceUnavailable(other.to_string()),
        }
    }
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::Connect(e) => e.into(),
            LifecycleError::Txn(_) | LifecycleError::Query(_) | LifecycleError::Payload { .. } => {
                Self::Upstream(err.to_string())
            }
            other => match other.code() {
                Some(code) => Self::from_code(code, other.to_string()),
                None => Self::Internal(other.to_string()),
            },
        }
    }
}
