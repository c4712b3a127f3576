//! Engine errors, one variant per layer that can fail.

use prodtrack_core::{ProductId, ValidationError};
use prodtrack_ledger::{ConnectError, ContractError, ErrorCode, QueryError, TxnError};
use prodtrack_state::LifecycleViolation;

/// A lifecycle operation failed.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// The product is not on the ledger.
    #[error("the product {0} does not exist")]
    NotFound(ProductId),

    /// Rejected by the local pre-check; nothing was submitted.
    #[error(transparent)]
    Violation(#[from] LifecycleViolation),

    /// An argument failed validation before anything was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The contract rejected the call.
    #[error("{0}")]
    Rejected(ContractError),

    /// No connection could be bound for the caller.
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// The transaction failed in transit or at the gateway.
    #[error(transparent)]
    Txn(TxnError),

    /// The query failed in transit or at the gateway.
    #[error(transparent)]
    Query(QueryError),

    /// The ledger answered with something the engine could not decode.
    #[error("malformed {function} result: {reason}")]
    Payload {
        function: &'static str,
        reason: String,
    },
}

impl LifecycleError {
    /// Wire code of the rejection, for errors that carry one.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::NotFound(_) => Some(ErrorCode::NotFound),
            Self::Violation(v) if v.is_access_denial() => Some(ErrorCode::AccessDenied),
            Self::Violation(_) => Some(ErrorCode::InvalidTransition),
            Self::Validation(_) => Some(ErrorCode::BadRequest),
            Self::Rejected(e) => Some(e.code),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code() == Some(ErrorCode::NotFound)
    }

    /// Map a submit failure; a `NOT_FOUND` rejection for `id` becomes
    /// [`LifecycleError::NotFound`].
    pub(crate) fn from_txn(id: Option<&ProductId>, e: TxnError) -> Self {
        match e {
            TxnError::Rejected(rejection) => Self::from_rejection(id, rejection),
            other => Self::Txn(other),
        }
    }

    /// Map an evaluate failure the same way.
    pub(crate) fn from_query(id: Option<&ProductId>, e: QueryError) -> Self {
        match e {
            QueryError::Rejected(rejection) => Self::from_rejection(id, rejection),
            other => Self::Query(other),
        }
    }

    fn from_rejection(id: Option<&ProductId>, rejection: ContractError) -> Self {
        match id {
            Some(id) if rejection.code == ErrorCode::NotFound => Self::NotFound(id.clone()),
            _ => Self::Rejected(rejection),
        }
    }
}
