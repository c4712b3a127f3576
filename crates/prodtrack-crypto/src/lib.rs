//! # prodtrack-crypto — Cryptographic Primitives
//!
//! - **Ed25519** key pairs, signatures and verification. Every identity
//!   issued by an enrollment authority is an Ed25519 key pair; the session
//!   bridge signs tokens with one as well.
//! - **PEM armour** for private keys and certificates so key material can
//!   be handed to callers and stored in keystore files as text.
//! - **Certificates**: the signed statement an enrollment authority issues
//!   binding a subject and MSP id to a public key.
//!
//! ## Crate Policy
//!
//! - Depends only on `prodtrack-core` internally.
//! - Private keys never implement `Serialize` or `Display`; the PEM export
//!   returns a `Zeroizing<String>`.

pub mod certificate;
pub mod ed25519;
pub mod error;
pub mod pem;

pub use certificate::{Certificate, CertificateRole};
pub use ed25519::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
pub use error::CryptoError;
