//! # prodtrack-ledger — Ledger Gateway
//!
//! Identity-scoped access to the product contract.
//!
//! - [`Connector`] binds `(org, user)` to a [`LedgerContract`] connection
//!   after loading the caller's identity from the store.
//! - [`HttpConnector`] signs every request with that identity and talks to
//!   the organization's gateway over REST.
//! - [`MemoryNetwork`] runs the [`ProductContract`] in-process, for tests
//!   and self-contained nodes.
//! - [`ConnectionPool`] keeps connections per identity, bounded and
//!   idle-evicted. There is no process-wide connection.
//!
//! ## Retry Policy
//!
//! `evaluate` is re-sent with exponential backoff on connection failures,
//! timeouts and `503` answers ([`RetryPolicy`]). `submit` is never retried.

pub mod chaincode;
pub mod config;
pub mod contract;
pub mod error;
pub mod gateway;
pub mod memory;
pub mod pool;
pub(crate) mod retry;
pub mod types;

pub use chaincode::{Caller, ProductContract};
pub use config::{ConfigError, GatewayConfig, PoolConfig, RetryPolicy};
pub use contract::{Committed, Connector, LedgerContract};
pub use error::{ConnectError, ContractError, ErrorCode, QueryError, TxnError};
pub use gateway::{HttpConnection, HttpConnector};
pub use memory::{MemoryConnection, MemoryNetwork};
pub use pool::ConnectionPool;
