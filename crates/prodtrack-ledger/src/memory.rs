//! # In-Process Ledger
//!
//! [`MemoryNetwork`] runs the product contract inside the process. A
//! connection still requires the caller's identity to be present in the
//! store, and the contract sees the organization and user from that
//! identity's certificate, exactly as a gateway would present them.

use std::sync::Arc;

use async_trait::async_trait;

use prodtrack_core::{Organization, UserId};
use prodtrack_wallet::IdentityStore;

use crate::chaincode::{Caller, ProductContract};
use crate::contract::{Committed, Connector, LedgerContract};
use crate::error::{ConnectError, QueryError, TxnError};

/// Connector over an in-process contract.
#[derive(Clone)]
pub struct MemoryNetwork {
    contract: Arc<ProductContract>,
    store: Arc<dyn IdentityStore>,
}

impl MemoryNetwork {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self::with_contract(Arc::new(ProductContract::new()), store)
    }

    /// Share an existing world state, e.g. with a stub gateway server.
    pub fn with_contract(contract: Arc<ProductContract>, store: Arc<dyn IdentityStore>) -> Self {
        Self { contract, store }
    }

    pub fn contract(&self) -> &Arc<ProductContract> {
        &self.contract
    }
}

impl std::fmt::Debug for MemoryNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryNetwork")
            .field("products", &self.contract.len())
            .finish()
    }
}

#[async_trait]
impl Connector for MemoryNetwork {
    async fn connect(
        &self,
        org: Organization,
        user: &UserId,
    ) -> Result<Arc<dyn LedgerContract>, ConnectError> {
        let identity = self.store.get(org, user)?;
        let caller = Caller::new(org, identity.user().clone());
        Ok(Arc::new(MemoryConnection {
            contract: self.contract.clone(),
            caller,
        }))
    }
}

/// A connection to the in-process contract.
#[derive(Debug)]
pub struct MemoryConnection {
    contract: Arc<ProductContract>,
    caller: Caller,
}

#[async_trait]
impl LedgerContract for MemoryConnection {
    fn org(&self) -> Organization {
        self.caller.org
    }

    fn user(&self) -> &UserId {
        &self.caller.user
    }

    async fn submit(&self, function: &str, args: &[String]) -> Result<Committed, TxnError> {
        let transaction_id = uuid::Uuid::new_v4().simple().to_string();
        let payload = self
            .contract
            .submit(&self.caller, function, args, &transaction_id)?;
        Ok(Committed {
            transaction_id,
            payload,
        })
    }

    async fn evaluate(&self, function: &str, args: &[String]) -> Result<Vec<u8>, QueryError> {
        Ok(self.contract.evaluate(&self.caller, function, args)?)
    }
}
