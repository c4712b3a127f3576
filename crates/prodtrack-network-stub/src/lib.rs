//! # prodtrack-network-stub
//!
//! A development stand-in for the permissioned network: one enrollment
//! authority per organization and a contract gateway, all in memory and
//! served from a single router. Point `ORG1_CA_URL`, `ORG2_CA_URL`,
//! `ORG1_GATEWAY_URL` and `ORG2_GATEWAY_URL` at it.
//!
//! Authorities are selected by `caname` (`ca-org1`, `ca-org2`). Both share
//! one issuing key, so any certificate the stub issued is accepted by the
//! gateway, which then trusts the organization named in it.

pub mod routes;
pub mod store;

pub use routes::router;
pub use store::StubState;
