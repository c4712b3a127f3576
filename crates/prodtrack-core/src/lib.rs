//! # prodtrack-core — Foundational Types
//!
//! Leaf crate of the workspace. Defines the identifier newtypes and the
//! timestamp type every other crate speaks in, so that a user id can never
//! be passed where a product id is expected and an organization is always
//! one of the known network members.
//!
//! ## Key Design Principles
//!
//! 1. **Closed organization set.** [`Organization`] is an enum, not a
//!    string. Request-facing aliases (`manufacturer`, `org1`, `Org1MSP`)
//!    resolve through one function.
//!
//! 2. **Validated identifiers.** [`UserId`] rejects anything that could not
//!    be used as a keystore file name; [`ProductId`] is generated from a
//!    content hash salted with a random nonce.
//!
//! 3. **UTC-only timestamps.** [`Timestamp`] is seconds-precision UTC and
//!    renders as `YYYY-MM-DDTHH:MM:SSZ`.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `prodtrack-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod temporal;

pub use error::ValidationError;
pub use identity::{Organization, ProductId, UserId, ADMIN_USER};
pub use temporal::Timestamp;
