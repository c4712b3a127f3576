//! In-memory authority registrations and the product contract.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use prodtrack_core::Organization;
use prodtrack_crypto::{CertificateRole, Ed25519KeyPair, Ed25519PublicKey};
use prodtrack_ledger::ProductContract;

/// An identity known to an authority.
#[derive(Debug, Clone)]
pub struct Registration {
    pub secret: String,
    pub role: CertificateRole,
    pub affiliation: String,
}

struct Inner {
    ca_key: Ed25519KeyPair,
    registrations: DashMap<(Organization, String), Registration>,
    contract: ProductContract,
}

/// Shared stub state. Clones share the same data.
#[derive(Clone)]
pub struct StubState {
    inner: Arc<Inner>,
}

impl StubState {
    /// Stub whose authorities sign with `ca_key`, with `admin_id` /
    /// `admin_secret` pre-registered as administrator in every organization.
    pub fn new(ca_key: Ed25519KeyPair, admin_id: &str, admin_secret: &str) -> Self {
        let registrations = DashMap::new();
        for org in Organization::ALL {
            registrations.insert(
                (org, admin_id.to_string()),
                Registration {
                    secret: admin_secret.to_string(),
                    role: CertificateRole::Admin,
                    affiliation: org.as_str().to_string(),
                },
            );
        }
        Self {
            inner: Arc::new(Inner {
                ca_key,
                registrations,
                contract: ProductContract::new(),
            }),
        }
    }

    pub fn ca_key(&self) -> &Ed25519KeyPair {
        &self.inner.ca_key
    }

    pub fn ca_public_key(&self) -> Ed25519PublicKey {
        self.inner.ca_key.public_key()
    }

    pub fn contract(&self) -> &ProductContract {
        &self.inner.contract
    }

    /// Record a new client registration. `None` if the id is taken.
    pub fn register(&self, org: Organization, id: &str, affiliation: &str) -> Option<String> {
        match self.inner.registrations.entry((org, id.to_string())) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let secret = uuid::Uuid::new_v4().simple().to_string();
                slot.insert(Registration {
                    secret: secret.clone(),
                    role: CertificateRole::Client,
                    affiliation: affiliation.to_string(),
                });
                Some(secret)
            }
        }
    }

    /// The registration for `id` if `secret` matches it.
    pub fn authenticate(&self, org: Organization, id: &str, secret: &str) -> Option<Registration> {
        self.inner
            .registrations
            .get(&(org, id.to_string()))
            .filter(|r| r.secret == secret)
            .map(|r| r.clone())
    }
}

impl std::fmt::Debug for StubState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StubState")
            .field("registrations", &self.inner.registrations.len())
            .field("products", &self.inner.contract.len())
            .finish()
    }
}
