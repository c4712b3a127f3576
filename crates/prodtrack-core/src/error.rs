//! # Validation Errors
//!
//! Constructor failures for the core newtypes. Higher layers wrap these
//! with `#[from]` and map them to a 4xx at the HTTP boundary.

use thiserror::Error;

/// A value failed validation while constructing a core type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The organization name is not a member of the network.
    #[error("unknown organization: {0:?}")]
    UnknownOrganization(String),

    /// The user id is empty, too long, or contains disallowed characters.
    #[error("invalid user id {value:?}: {reason}")]
    InvalidUserId {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The product id is empty, too long, or not printable ASCII.
    #[error("invalid product id {value:?}: {reason}")]
    InvalidProductId {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A price is not a non-negative decimal number.
    #[error("invalid price {value:?}: {reason}")]
    InvalidPrice {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A timestamp could not be parsed or is out of range.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// A required field was missing or blank.
    #[error("{0} is missing")]
    MissingField(&'static str),
}
