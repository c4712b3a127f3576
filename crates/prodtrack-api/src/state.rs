//! # Application State
//!
//! Shared by every handler through the `State` extractor. Nothing here
//! caches ledger data: products live on the ledger, identities in the
//! identity store, and ledger connections in the identity-scoped pool
//! behind [`AppState::ledger`].

use std::sync::Arc;

use prodtrack_ca_client::EnrollmentService;
use prodtrack_core::{Organization, UserId};
use prodtrack_ledger::Connector;
use prodtrack_lifecycle::ProductEngine;
use prodtrack_session::SessionBridge;
use prodtrack_wallet::IdentityStore;

use crate::config::AppConfig;
use crate::error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub enrollment: EnrollmentService,
    pub sessions: Arc<SessionBridge>,
    /// Hands out ledger connections, normally a `ConnectionPool`.
    pub ledger: Arc<dyn Connector>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("enrollment", &self.enrollment)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(
        config: AppConfig,
        enrollment: EnrollmentService,
        sessions: SessionBridge,
        ledger: Arc<dyn Connector>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            enrollment,
            sessions: Arc::new(sessions),
            ledger,
        }
    }

    /// The identity store shared by enrollment, login and the ledger.
    pub fn store(&self) -> &Arc<dyn IdentityStore> {
        self.enrollment.store()
    }

    /// A lifecycle engine acting as `user` of `org`.
    pub async fn engine(&self, org: Organization, user: &UserId) -> Result<ProductEngine, AppError> {
        Ok(ProductEngine::connect(self.ledger.as_ref(), org, user).await?)
    }
}
