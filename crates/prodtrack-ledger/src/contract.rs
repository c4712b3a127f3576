//! # Connection Traits
//!
//! [`Connector`] binds a caller's identity to a [`LedgerContract`]
//! connection. The contract surface is deliberately small: positional
//! string arguments in, raw bytes out, exactly as a ledger gateway carries
//! them. Typed decoding is the lifecycle engine's job.

use std::sync::Arc;

use async_trait::async_trait;

use prodtrack_core::{Organization, UserId};

use crate::error::{ConnectError, QueryError, TxnError};

/// A committed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed {
    /// Ledger transaction id.
    pub transaction_id: String,
    /// Bytes returned by the contract function.
    pub payload: Vec<u8>,
}

/// A connection to the product contract acting as one identity.
#[async_trait]
pub trait LedgerContract: Send + Sync {
    /// Organization of the bound identity.
    fn org(&self) -> Organization;

    /// User id of the bound identity.
    fn user(&self) -> &UserId;

    /// Submit a transaction and wait for it to commit. Never retried.
    async fn submit(&self, function: &str, args: &[String]) -> Result<Committed, TxnError>;

    /// Evaluate a read-only query.
    async fn evaluate(&self, function: &str, args: &[String]) -> Result<Vec<u8>, QueryError>;
}

/// Hands out identity-scoped connections.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect as `user` of `org`, loading the identity from the store.
    async fn connect(
        &self,
        org: Organization,
        user: &UserId,
    ) -> Result<Arc<dyn LedgerContract>, ConnectError>;

    /// Forget any cached connection for `(org, user)` so the next
    /// `connect` reloads the identity. Returns whether one was dropped.
    fn release(&self, _org: Organization, _user: &UserId) -> bool {
        false
    }
}
