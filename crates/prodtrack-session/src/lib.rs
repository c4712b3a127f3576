//! # prodtrack-session — Session Bridge
//!
//! Turns a proven ledger identity into a signed, time-limited session token
//! and back.
//!
//! - [`SessionBridge::authenticate`] checks possession of the stored private
//!   key (constant-time, byte-for-byte) and issues a token.
//! - [`SessionBridge::verify_token`] is stateless: nothing about issued
//!   tokens is kept server-side.
//!
//! Tokens are `base64url(claims) "." base64url(signature)` with Ed25519
//! signatures under a server-held key derived from `SESSION_SECRET`.

pub mod bridge;
pub mod config;
pub mod error;
pub mod token;

pub use bridge::SessionBridge;
pub use config::{ConfigError, SessionConfig};
pub use error::{AuthFailure, TokenError};
pub use token::{SessionClaims, SessionToken};
