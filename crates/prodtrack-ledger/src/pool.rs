//! # Identity-Scoped Connection Pool
//!
//! Connections are keyed by `(org, user)`. A hit refreshes the entry's
//! last-use time; a miss connects through the wrapped [`Connector`] and
//! inserts the result. Entries idle for longer than the configured timeout
//! are dropped on every access (and by [`ConnectionPool::evict_idle`]), and
//! once the pool is over capacity the least recently used entry goes.
//!
//! The entry lock is never held across a connect. Misses for the same key
//! queue on a per-key async mutex instead, so concurrent first use of an
//! identity connects once and every caller shares the result.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use prodtrack_core::{Organization, UserId};

use crate::config::PoolConfig;
use crate::contract::{Connector, LedgerContract};
use crate::error::ConnectError;

type PoolKey = (Organization, UserId);

struct PoolEntry {
    connection: Arc<dyn LedgerContract>,
    last_used: Instant,
}

/// Bounded, idle-evicting pool in front of a [`Connector`].
pub struct ConnectionPool<C> {
    connector: C,
    config: PoolConfig,
    entries: Mutex<HashMap<PoolKey, PoolEntry>>,
    connecting: DashMap<PoolKey, Arc<tokio::sync::Mutex<()>>>,
}

impl<C> std::fmt::Debug for ConnectionPool<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("config", &self.config)
            .field("len", &self.entries.lock().len())
            .finish()
    }
}

impl<C: Connector> ConnectionPool<C> {
    pub fn new(connector: C, config: PoolConfig) -> Self {
        Self {
            connector,
            config,
            entries: Mutex::new(HashMap::new()),
            connecting: DashMap::new(),
        }
    }

    /// The wrapped connector.
    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Number of pooled connections.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drop the pooled connection for `(org, user)`, if any.
    pub fn invalidate(&self, org: Organization, user: &UserId) -> bool {
        self.entries.lock().remove(&(org, user.clone())).is_some()
    }

    /// Drop every connection idle for longer than the timeout. Returns how
    /// many were dropped.
    pub fn evict_idle(&self) -> usize {
        self.evict_idle_at(Instant::now())
    }

    fn evict_idle_at(&self, now: Instant) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        let idle = self.config.idle_timeout;
        entries.retain(|_, e| now.saturating_duration_since(e.last_used) <= idle);
        let evicted = before - entries.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = entries.len(), "evicted idle ledger connections");
        }
        evicted
    }

    /// Pooled connection for `(org, user)`, connecting on a miss.
    pub async fn get(
        &self,
        org: Organization,
        user: &UserId,
    ) -> Result<Arc<dyn LedgerContract>, ConnectError> {
        self.evict_idle_at(Instant::now());
        let key = (org, user.clone());
        if let Some(hit) = self.touch(&key) {
            return Ok(hit);
        }

        let gate = self.connecting.entry(key.clone()).or_default().clone();
        let result = {
            let _guard = gate.lock().await;
            match self.touch(&key) {
                Some(hit) => Ok(hit),
                None => self.connect_and_insert(key.clone()).await,
            }
        };
        drop(gate);
        self.connecting
            .remove_if(&key, |_, g| Arc::strong_count(g) == 1);
        result
    }

    /// Pooled connection for `key`, refreshing its last-use time.
    fn touch(&self, key: &PoolKey) -> Option<Arc<dyn LedgerContract>> {
        let mut entries = self.entries.lock();
        let entry = entries.get_mut(key)?;
        entry.last_used = Instant::now();
        Some(entry.connection.clone())
    }

    async fn connect_and_insert(
        &self,
        key: PoolKey,
    ) -> Result<Arc<dyn LedgerContract>, ConnectError> {
        let connection = self.connector.connect(key.0, &key.1).await?;
        let mut entries = self.entries.lock();
        entries.insert(
            key,
            PoolEntry {
                connection: connection.clone(),
                last_used: Instant::now(),
            },
        );
        while entries.len() > self.config.max_connections {
            let Some(lru) = entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone())
            else {
                break;
            };
            entries.remove(&lru);
            tracing::debug!(org = %lru.0, user = %lru.1, "evicted least recently used ledger connection");
        }
        Ok(connection)
    }
}

#[async_trait]
impl<C: Connector> Connector for ConnectionPool<C> {
    async fn connect(
        &self,
        org: Organization,
        user: &UserId,
    ) -> Result<Arc<dyn LedgerContract>, ConnectError> {
        self.get(org, user).await
    }

    fn release(&self, org: Organization, user: &UserId) -> bool {
        self.invalidate(org, user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::Committed;
    use crate::error::{QueryError, TxnError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Stub {
        org: Organization,
        user: UserId,
    }

    #[async_trait]
    impl LedgerContract for Stub {
        fn org(&self) -> Organization {
            self.org
        }
        fn user(&self) -> &UserId {
            &self.user
        }
        async fn submit(&self, _: &str, _: &[String]) -> Result<Committed, TxnError> {
            Ok(Committed {
                transaction_id: "tx".into(),
                payload: Vec::new(),
            })
        }
        async fn evaluate(&self, _: &str, _: &[String]) -> Result<Vec<u8>, QueryError> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct CountingConnector {
        connects: AtomicUsize,
    }

    #[async_trait]
    impl Connector for CountingConnector {
        async fn connect(
            &self,
            org: Organization,
            user: &UserId,
        ) -> Result<Arc<dyn LedgerContract>, ConnectError> {
            if user.as_str() == "ghost" {
                return Err(ConnectError::IdentityNotFound {
                    org,
                    user: user.clone(),
                });
            }
            self.connects.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Stub {
                org,
                user: user.clone(),
            }))
        }
    }

    struct SlowConnector {
        inner: CountingConnector,
        delay: Duration,
    }

    #[async_trait]
    impl Connector for SlowConnector {
        async fn connect(
            &self,
            org: Organization,
            user: &UserId,
        ) -> Result<Arc<dyn LedgerContract>, ConnectError> {
            tokio::time::sleep(self.delay).await;
            self.inner.connect(org, user).await
        }
    }

    fn user(name: &str) -> UserId {
        UserId::new(name).unwrap()
    }

    fn pool(max: usize, idle: Duration) -> ConnectionPool<CountingConnector> {
        ConnectionPool::new(
            CountingConnector::default(),
            PoolConfig {
                max_connections: max,
                idle_timeout: idle,
            },
        )
    }

    #[tokio::test]
    async fn test_reuses_connection_per_identity() {
        let pool = pool(8, Duration::from_secs(60));
        let a = pool.get(Organization::Org1, &user("alice")).await.unwrap();
        let b = pool.get(Organization::Org1, &user("alice")).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(pool.connector().connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_connections_are_scoped_by_org_and_user() {
        let pool = pool(8, Duration::from_secs(60));
        let a = pool.get(Organization::Org1, &user("alice")).await.unwrap();
        let b = pool.get(Organization::Org2, &user("alice")).await.unwrap();
        let c = pool.get(Organization::Org1, &user("bob")).await.unwrap();
        assert_eq!(a.org(), Organization::Org1);
        assert_eq!(b.org(), Organization::Org2);
        assert_eq!(c.user().as_str(), "bob");
        assert_eq!(pool.len(), 3);
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recently_used() {
        let pool = pool(2, Duration::from_secs(60));
        pool.get(Organization::Org1, &user("a")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        pool.get(Organization::Org1, &user("b")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        pool.get(Organization::Org1, &user("a")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        pool.get(Organization::Org1, &user("c")).await.unwrap();

        assert_eq!(pool.len(), 2);
        assert!(!pool.invalidate(Organization::Org1, &user("b")));
        assert!(pool.invalidate(Organization::Org1, &user("a")));
    }

    #[tokio::test]
    async fn test_idle_connections_are_evicted() {
        let pool = pool(8, Duration::from_millis(20));
        pool.get(Organization::Org1, &user("alice")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(pool.evict_idle(), 1);
        assert!(pool.is_empty());
        pool.get(Organization::Org1, &user("alice")).await.unwrap();
        assert_eq!(pool.connector().connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_first_use_connects_once() {
        let pool = ConnectionPool::new(
            SlowConnector {
                inner: CountingConnector::default(),
                delay: Duration::from_millis(50),
            },
            PoolConfig::default(),
        );
        let alice = user("alice");
        let (a, b) = tokio::join!(
            pool.get(Organization::Org1, &alice),
            pool.get(Organization::Org1, &alice)
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(pool.connector().inner.connects.load(Ordering::SeqCst), 1);
        assert!(pool.connecting.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_first_use_of_distinct_identities_is_not_serialized() {
        let pool = ConnectionPool::new(
            SlowConnector {
                inner: CountingConnector::default(),
                delay: Duration::from_millis(100),
            },
            PoolConfig::default(),
        );
        let alice = user("alice");
        let bob = user("bob");
        let started = Instant::now();
        let (a, b) = tokio::join!(
            pool.get(Organization::Org1, &alice),
            pool.get(Organization::Org1, &bob)
        );
        a.unwrap();
        b.unwrap();
        assert!(started.elapsed() < Duration::from_millis(190));
        assert_eq!(pool.connector().inner.connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_release_forces_a_fresh_connect() {
        let pool = pool(8, Duration::from_secs(60));
        let alice = user("alice");
        let first = pool.get(Organization::Org1, &alice).await.unwrap();
        let connector: &dyn Connector = &pool;
        assert!(connector.release(Organization::Org1, &alice));
        assert!(!connector.release(Organization::Org1, &alice));
        let second = pool.get(Organization::Org1, &alice).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(pool.connector().connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_connect_failure_is_not_cached() {
        let pool = pool(8, Duration::from_secs(60));
        assert!(matches!(
            pool.get(Organization::Org2, &user("ghost")).await,
            Err(ConnectError::IdentityNotFound { .. })
        ));
        assert!(pool.is_empty());
    }
}
