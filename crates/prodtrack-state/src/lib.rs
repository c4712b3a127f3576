//! # prodtrack-state — Product Lifecycle State Machine
//!
//! ```text
//! (none) --Create--> Pending --Order--> Pending (consumer set)
//! Pending --Accept--> Accepted --Ship--> Shipped --Deliver--> Delivered
//! ```
//!
//! `Delivered` is terminal. Ordering records the consumer without moving the
//! status; acceptance requires a recorded consumer.
//!
//! The same transition table is used twice: by the lifecycle engine as a
//! pre-check against a fresh read, and by the ledger contract as the
//! authoritative, atomic check. Neither side duplicates the rules.
//!
//! ## Crate Policy
//!
//! Pure data and validation. No I/O, no clocks: every timestamp is an
//! argument.

pub mod error;
pub mod operation;
pub mod product;
pub mod status;
pub mod transition;

pub use error::LifecycleViolation;
pub use operation::Operation;
pub use product::{HistoryEntry, Price, Product};
pub use status::ProductStatus;
pub use transition::Transition;
