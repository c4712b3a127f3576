//! Lifecycle rule violations.

use prodtrack_core::{Organization, UserId};
use thiserror::Error;

use crate::operation::Operation;
use crate::status::ProductStatus;

/// A transition the lifecycle rules do not allow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleViolation {
    /// The current status does not lead to the requested one.
    #[error("invalid product transition from {from} to {to}")]
    InvalidTransition {
        from: ProductStatus,
        to: ProductStatus,
    },

    /// The product is already in a terminal state.
    #[error("product is already {status}; no further transitions")]
    AlreadyTerminal { status: ProductStatus },

    /// Acceptance needs an order first.
    #[error("product has not been ordered")]
    NotOrdered,

    /// A consumer has already ordered the product.
    #[error("product has already been ordered by {consumer}")]
    AlreadyOrdered { consumer: UserId },

    /// The acting manufacturer does not own the product.
    #[error("product belongs to manufacturer {expected}, not {actual}")]
    NotManufacturer { expected: UserId, actual: UserId },

    /// The acting consumer is not the one who ordered the product.
    #[error("product was ordered by {expected}, not {actual}")]
    NotConsumer { expected: UserId, actual: UserId },

    /// The caller's organization may not invoke the function.
    #[error(
        "Access denied: Only peers in {} are allowed to execute {operation}",
        .required.msp_id()
    )]
    AccessDenied {
        operation: Operation,
        required: Organization,
    },
}

impl LifecycleViolation {
    /// Whether the violation is about who is acting rather than the
    /// product's state.
    pub fn is_access_denial(&self) -> bool {
        matches!(
            self,
            Self::AccessDenied { .. } | Self::NotManufacturer { .. } | Self::NotConsumer { .. }
        )
    }
}
