//! # Route Modules
//!
//! - [`users`]: registration and login (unauthenticated).
//! - [`products`]: lifecycle mutations.
//! - [`queries`]: product reads and listings.

pub mod products;
pub mod queries;
pub mod users;

use serde::Serialize;

/// Success envelope with a message and optional fields, matching what the
/// UI reads.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(flatten)]
    pub body: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(body: T) -> axum::Json<Self> {
        axum::Json(Self {
            success: true,
            body,
        })
    }
}
