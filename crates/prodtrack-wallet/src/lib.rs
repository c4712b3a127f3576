//! # prodtrack-wallet — Identity Store
//!
//! Durable mapping from `(Organization, UserId)` to an [`IdentityRecord`]:
//! the enrollment certificate, the matching private key, and the MSP id.
//!
//! ## Write semantics
//!
//! The store offers two writes and leaves the choice to the caller:
//!
//! - [`IdentityStore::put_new`] fails with [`WalletError::AlreadyExists`]
//!   when the key is taken. End-user registration always uses this, so a
//!   second registration can never orphan a certificate already handed out.
//! - [`IdentityStore::put_overwrite`] replaces. Only the administrative
//!   bootstrap identity is written this way.
//!
//! Both are atomic per key: of two concurrent `put_new` calls for the same
//! key exactly one succeeds.
//!
//! ## Backends
//!
//! - [`InMemoryWallet`] — `parking_lot::RwLock<HashMap<..>>`, for tests and
//!   single-process deployments.
//! - [`FileSystemWallet`] — one directory per organization, one
//!   `<user>.id` JSON file per identity.

pub mod error;
pub mod fs;
pub mod memory;
pub mod record;

pub use error::WalletError;
pub use fs::FileSystemWallet;
pub use memory::InMemoryWallet;
pub use record::IdentityRecord;

use prodtrack_core::{Organization, UserId};

/// Storage contract for enrolled identities.
pub trait IdentityStore: Send + Sync {
    /// Fetch the identity for `(org, user)`.
    fn get(&self, org: Organization, user: &UserId) -> Result<IdentityRecord, WalletError>;

    /// Whether an identity exists for `(org, user)`. Side-effect free.
    fn exists(&self, org: Organization, user: &UserId) -> Result<bool, WalletError>;

    /// Insert a first identity for the record's key.
    fn put_new(&self, record: IdentityRecord) -> Result<(), WalletError>;

    /// Insert or replace the identity for the record's key.
    fn put_overwrite(&self, record: IdentityRecord) -> Result<(), WalletError>;

    /// Delete the identity for `(org, user)`.
    fn remove(&self, org: Organization, user: &UserId) -> Result<IdentityRecord, WalletError>;

    /// All user ids stored for `org`, sorted.
    fn list(&self, org: Organization) -> Result<Vec<UserId>, WalletError>;
}
