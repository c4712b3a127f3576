//! # prodtrack-lifecycle — Product Lifecycle Engine
//!
//! Typed operations over a [`LedgerContract`](prodtrack_ledger::LedgerContract)
//! connection bound to the calling identity:
//!
//! ```text
//! (none) --create--> Pending --order--> Pending (consumer set)
//! Pending --accept--> Accepted --ship--> Shipped --deliver--> Delivered
//! ```
//!
//! Every mutation is checked locally first (organization, then the
//! transition table against a fresh read) so that obvious mistakes never
//! become ledger transactions. The contract repeats the same checks
//! authoritatively when the transaction executes.

pub mod engine;
pub mod error;

pub use engine::{NewProduct, ProductEngine, ProductUpdate, Receipt};
pub use error::LifecycleError;
