//! In-memory keystore.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use prodtrack_core::{Organization, UserId};

use crate::error::WalletError;
use crate::record::IdentityRecord;
use crate::IdentityStore;

type Key = (Organization, UserId);

/// Thread-safe in-memory identity store.
///
/// Cloning shares the underlying map. `put_new` checks and inserts under
/// one write lock, so concurrent first registrations for a key cannot
/// both succeed.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWallet {
    data: Arc<RwLock<HashMap<Key, IdentityRecord>>>,
}

impl InMemoryWallet {
    /// Create an empty wallet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of identities across all organizations.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the wallet holds no identities.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IdentityStore for InMemoryWallet {
    fn get(&self, org: Organization, user: &UserId) -> Result<IdentityRecord, WalletError> {
        self.data
            .read()
            .get(&(org, user.clone()))
            .cloned()
            .ok_or_else(|| WalletError::NotFound {
                org,
                user: user.clone(),
            })
    }

    fn exists(&self, org: Organization, user: &UserId) -> Result<bool, WalletError> {
        Ok(self.data.read().contains_key(&(org, user.clone())))
    }

    fn put_new(&self, record: IdentityRecord) -> Result<(), WalletError> {
        let key = (record.org(), record.user().clone());
        let mut guard = self.data.write();
        if guard.contains_key(&key) {
            return Err(WalletError::AlreadyExists {
                org: key.0,
                user: key.1,
            });
        }
        guard.insert(key, record);
        Ok(())
    }

    fn put_overwrite(&self, record: IdentityRecord) -> Result<(), WalletError> {
        let key = (record.org(), record.user().clone());
        self.data.write().insert(key, record);
        Ok(())
    }

    fn remove(&self, org: Organization, user: &UserId) -> Result<IdentityRecord, WalletError> {
        self.data
            .write()
            .remove(&(org, user.clone()))
            .ok_or_else(|| WalletError::NotFound {
                org,
                user: user.clone(),
            })
    }

    fn list(&self, org: Organization) -> Result<Vec<UserId>, WalletError> {
        let mut users: Vec<UserId> = self
            .data
            .read()
            .keys()
            .filter(|(o, _)| *o == org)
            .map(|(_, u)| u.clone())
            .collect();
        users.sort();
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fixtures::record;

    #[test]
    fn test_get_missing_is_not_found() {
        let wallet = InMemoryWallet::new();
        let user = UserId::new("ghost").unwrap();
        assert!(matches!(
            wallet.get(Organization::Org1, &user),
            Err(WalletError::NotFound { .. })
        ));
        assert!(!wallet.exists(Organization::Org1, &user).unwrap());
    }

    #[test]
    fn test_put_new_then_get() {
        let wallet = InMemoryWallet::new();
        let rec = record(Organization::Org1, "alice");
        wallet.put_new(rec.clone()).unwrap();
        let got = wallet.get(Organization::Org1, rec.user()).unwrap();
        assert_eq!(got.private_key_pem(), rec.private_key_pem());
        assert!(wallet.exists(Organization::Org1, rec.user()).unwrap());
    }

    #[test]
    fn test_put_new_refuses_existing_and_keeps_first() {
        let wallet = InMemoryWallet::new();
        let first = record(Organization::Org1, "alice");
        let second = record(Organization::Org1, "alice");
        wallet.put_new(first.clone()).unwrap();
        assert!(matches!(
            wallet.put_new(second),
            Err(WalletError::AlreadyExists { .. })
        ));
        let stored = wallet.get(Organization::Org1, first.user()).unwrap();
        assert_eq!(stored.private_key_pem(), first.private_key_pem());
    }

    #[test]
    fn test_put_overwrite_replaces() {
        let wallet = InMemoryWallet::new();
        let first = record(Organization::Org2, "admin");
        let second = record(Organization::Org2, "admin");
        wallet.put_overwrite(first).unwrap();
        wallet.put_overwrite(second.clone()).unwrap();
        let stored = wallet.get(Organization::Org2, second.user()).unwrap();
        assert_eq!(stored.private_key_pem(), second.private_key_pem());
        assert_eq!(wallet.len(), 1);
    }

    #[test]
    fn test_same_user_in_two_orgs_is_two_keys() {
        let wallet = InMemoryWallet::new();
        wallet.put_new(record(Organization::Org1, "alice")).unwrap();
        wallet.put_new(record(Organization::Org2, "alice")).unwrap();
        assert_eq!(wallet.list(Organization::Org1).unwrap().len(), 1);
        assert_eq!(wallet.list(Organization::Org2).unwrap().len(), 1);
    }

    #[test]
    fn test_remove() {
        let wallet = InMemoryWallet::new();
        let rec = record(Organization::Org1, "alice");
        wallet.put_new(rec.clone()).unwrap();
        wallet.remove(Organization::Org1, rec.user()).unwrap();
        assert!(wallet.is_empty());
        assert!(wallet.remove(Organization::Org1, rec.user()).is_err());
    }

    #[test]
    fn test_concurrent_put_new_single_winner() {
        let wallet = InMemoryWallet::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let wallet = wallet.clone();
                let rec = record(Organization::Org1, "racer");
                std::thread::spawn(move || wallet.put_new(rec).is_ok())
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(winners, 1);
    }
}
