//! # Enrollment Workflow
//!
//! Ties the authority clients to the identity store.
//!
//! ## Concurrency
//!
//! Calls for the same `(org, user)` are serialized through a per-key async
//! mutex, so of two concurrent registrations for a new user exactly one
//! reaches the authority and the other observes `AlreadyRegistered`. The
//! store's `put_new` is the final guard against writers outside this
//! process.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use zeroize::Zeroizing;

use prodtrack_core::{Organization, UserId};
use prodtrack_crypto::Ed25519KeyPair;
use prodtrack_wallet::{IdentityRecord, IdentityStore, WalletError};

use crate::client::AuthorityClient;
use crate::config::{CaConfig, ConfigError};
use crate::error::EnrollmentError;

type LockKey = (Organization, UserId);

/// Result of a successful end-user registration.
///
/// This is the only place private key material leaves the store boundary;
/// deliver it to the user and drop it.
pub struct Enrollment {
    /// The stored identity.
    pub identity: IdentityRecord,
    /// The one-time enrollment secret issued by the authority.
    pub secret: Zeroizing<String>,
}

impl Enrollment {
    /// PEM private key to hand back to the user.
    pub fn private_key_pem(&self) -> &str {
        self.identity.private_key_pem()
    }
}

impl std::fmt::Debug for Enrollment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Enrollment")
            .field("identity", &self.identity)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Administrator bootstrap and user registration against the configured
/// authorities.
#[derive(Clone)]
pub struct EnrollmentService {
    store: Arc<dyn IdentityStore>,
    authorities: BTreeMap<Organization, AuthorityClient>,
    admin_id: UserId,
    admin_secret: Zeroizing<String>,
    locks: Arc<DashMap<LockKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl std::fmt::Debug for EnrollmentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrollmentService")
            .field("authorities", &self.authorities)
            .field("admin_id", &self.admin_id)
            .field("admin_secret", &"[REDACTED]")
            .finish()
    }
}

impl EnrollmentService {
    /// Build the service and one HTTP client shared by every authority.
    pub fn new(config: CaConfig, store: Arc<dyn IdentityStore>) -> Result<Self, EnrollmentError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EnrollmentError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;
        let admin_id = UserId::new(config.admin_id.clone())
            .map_err(|e| ConfigError::InvalidAdminId(e.to_string()))?;
        let authorities = config
            .authorities
            .into_iter()
            .map(|(org, ep)| (org, AuthorityClient::new(http.clone(), ep.url, ep.ca_name)))
            .collect();
        Ok(Self {
            store,
            authorities,
            admin_id,
            admin_secret: config.admin_secret,
            locks: Arc::new(DashMap::new()),
        })
    }

    /// The identity store this service writes to.
    pub fn store(&self) -> &Arc<dyn IdentityStore> {
        &self.store
    }

    /// Authority client for `org`.
    pub fn authority(&self, org: Organization) -> Result<&AuthorityClient, EnrollmentError> {
        self.authorities
            .get(&org)
            .ok_or(EnrollmentError::UnknownAuthority(org))
    }

    /// Enroll the organization's administrator if it is not already stored.
    ///
    /// Idempotent: a stored admin identity is returned as-is without
    /// contacting the authority.
    pub async fn enroll_administrator(
        &self,
        org: Organization,
    ) -> Result<IdentityRecord, EnrollmentError> {
        let lock = self.lock_for(org, &self.admin_id);
        let result = {
            let _guard = lock.lock().await;
            self.enroll_administrator_locked(org).await
        };
        self.release_lock(org, &self.admin_id, lock);
        result
    }

    async fn enroll_administrator_locked(
        &self,
        org: Organization,
    ) -> Result<IdentityRecord, EnrollmentError> {
        match self.store.get(org, &self.admin_id) {
            Ok(existing) => {
                tracing::debug!(%org, "admin identity already enrolled");
                return Ok(existing);
            }
            Err(WalletError::NotFound { .. }) => {}
            Err(e) => return Err(e.into()),
        }

        let authority = self.authority(org)?;
        let key = Ed25519KeyPair::generate();
        let cert_pem = authority
            .enroll(self.admin_id.as_str(), &self.admin_secret, &key.public_key())
            .await?;
        let record = IdentityRecord::new(
            org,
            self.admin_id.clone(),
            cert_pem,
            key.to_private_pem(),
            None,
        )
        .map_err(|e| EnrollmentError::InvalidCertificate(e.to_string()))?;
        self.store.put_overwrite(record.clone())?;
        tracing::info!(%org, msp_id = record.msp_id(), "enrolled admin identity");
        Ok(record)
    }

    /// Register a new user with the authority, enroll it, and store the
    /// identity.
    ///
    /// `affiliation` defaults to `<org>.department1`.
    pub async fn register_and_enroll(
        &self,
        org: Organization,
        user: &UserId,
        affiliation: Option<&str>,
    ) -> Result<Enrollment, EnrollmentError> {
        let lock = self.lock_for(org, user);
        let result = {
            let _guard = lock.lock().await;
            self.register_and_enroll_locked(org, user, affiliation).await
        };
        self.release_lock(org, user, lock);
        result
    }

    async fn register_and_enroll_locked(
        &self,
        org: Organization,
        user: &UserId,
        affiliation: Option<&str>,
    ) -> Result<Enrollment, EnrollmentError> {
        if self.store.exists(org, user)? {
            return Err(EnrollmentError::AlreadyRegistered {
                org,
                user: user.clone(),
            });
        }

        let admin = match self.store.get(org, &self.admin_id) {
            Ok(admin) => admin,
            Err(WalletError::NotFound { .. }) => return Err(EnrollmentError::AdminRequired { org }),
            Err(e) => return Err(e.into()),
        };

        let authority = self.authority(org)?;
        let affiliation = affiliation
            .map(str::to_string)
            .unwrap_or_else(|| org.default_affiliation());
        let secret = authority
            .register(&admin, user.as_str(), &affiliation)
            .await?;

        let key = Ed25519KeyPair::generate();
        let cert_pem = authority
            .enroll(user.as_str(), &secret, &key.public_key())
            .await?;
        let record = IdentityRecord::new(
            org,
            user.clone(),
            cert_pem,
            key.to_private_pem(),
            Some(secret.clone()),
        )
        .map_err(|e| EnrollmentError::InvalidCertificate(e.to_string()))?;

        match self.store.put_new(record.clone()) {
            Ok(()) => {}
            Err(WalletError::AlreadyExists { org, user }) => {
                return Err(EnrollmentError::AlreadyRegistered { org, user })
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(%org, %user, %affiliation, "registered and enrolled user");
        Ok(Enrollment {
            identity: record,
            secret,
        })
    }

    fn lock_for(&self, org: Organization, user: &UserId) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .entry((org, user.clone()))
            .or_default()
            .clone()
    }

    /// Drop the map entry once no other caller holds the key's mutex.
    fn release_lock(&self, org: Organization, user: &UserId, lock: Arc<tokio::sync::Mutex<()>>) {
        drop(lock);
        self.locks
            .remove_if(&(org, user.clone()), |_, l| Arc::strong_count(l) == 1);
    }
}
