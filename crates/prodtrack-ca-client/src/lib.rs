//! # prodtrack-ca-client — Enrollment Authority Client
//!
//! Every organization runs its own enrollment authority. This crate talks
//! to them and keeps the identity store consistent with what they issued:
//!
//! - [`EnrollmentService::enroll_administrator`] — idempotent bootstrap of
//!   the organization's admin identity with the pre-shared secret.
//! - [`EnrollmentService::register_and_enroll`] — register a user (admin
//!   as registrar), enroll with the one-time secret, store the identity,
//!   and hand the private key back exactly once.
//!
//! ## Failure semantics
//!
//! Authority failures surface as [`EnrollmentError`] carrying the
//! authority's own message. Nothing here retries; registration is not
//! idempotent on the authority side.
//!
//! ## Key generation
//!
//! Key pairs are generated locally and only the public half is sent to the
//! authority for certification.

pub mod client;
pub mod config;
pub mod enrollment;
pub mod error;
pub mod types;

pub use client::AuthorityClient;
pub use config::{AuthorityEndpoint, CaConfig, ConfigError};
pub use enrollment::{Enrollment, EnrollmentService};
pub use error::EnrollmentError;
