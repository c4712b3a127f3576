//! # Product Engine
//!
//! One engine per request, bound to the caller's connection. Mutations
//! follow the same three steps:
//!
//! 1. organization check against [`Operation::required_org`];
//! 2. fresh `ReadProduct` and [`Transition::apply`] on the result;
//! 3. `submit`, decoding the product the contract returns.
//!
//! Step 2 can pass while the ledger moves on before step 3 commits; the
//! contract then rejects and the error surfaces as
//! [`LifecycleError::Rejected`].

use std::sync::Arc;

use serde::de::DeserializeOwned;

use prodtrack_core::{Organization, ProductId, Timestamp, UserId, ValidationError};
use prodtrack_ledger::{Connector, LedgerContract};
use prodtrack_state::{
    HistoryEntry, LifecycleViolation, Operation, Price, Product, ProductStatus, Transition,
};

use crate::error::LifecycleError;

/// Fields supplied when creating a product. The manufacturer is the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub created_at: Timestamp,
}

/// Replacement descriptive fields for a not-yet-ordered product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductUpdate {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub modified_at: Timestamp,
}

/// A committed mutation and the product as it stands after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub transaction_id: String,
    pub product: Product,
}

/// Lifecycle operations acting as one identity.
#[derive(Clone)]
pub struct ProductEngine {
    contract: Arc<dyn LedgerContract>,
}

impl std::fmt::Debug for ProductEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductEngine")
            .field("org", &self.contract.org())
            .field("user", self.contract.user())
            .finish()
    }
}

impl ProductEngine {
    pub fn new(contract: Arc<dyn LedgerContract>) -> Self {
        Self { contract }
    }

    /// Bind an engine to `user` of `org` through `connector`.
    pub async fn connect(
        connector: &dyn Connector,
        org: Organization,
        user: &UserId,
    ) -> Result<Self, LifecycleError> {
        Ok(Self::new(connector.connect(org, user).await?))
    }

    /// Organization of the acting identity.
    pub fn org(&self) -> Organization {
        self.contract.org()
    }

    /// The acting identity.
    pub fn user(&self) -> &UserId {
        self.contract.user()
    }

    // ---- Mutations ----

    /// Create a product manufactured by the caller. The id is derived from
    /// the inputs and a random nonce.
    pub async fn create_product(&self, draft: NewProduct) -> Result<Receipt, LifecycleError> {
        self.authorize(Operation::CreateProduct)?;
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingField("name").into());
        }
        let id = ProductId::generate(self.user(), name, &draft.description, draft.created_at);
        let args = vec![
            id.to_string(),
            name.to_string(),
            draft.description,
            draft.price.to_string(),
            self.user().to_string(),
            draft.created_at.to_iso8601(),
        ];
        let receipt = self.submit(Operation::CreateProduct, &id, &args).await?;
        tracing::info!(
            product_id = %id,
            manufacturer = %self.user(),
            tx_id = %receipt.transaction_id,
            "product created"
        );
        Ok(receipt)
    }

    /// Replace name, description and price of a product not yet ordered.
    pub async fn update_product(
        &self,
        id: &ProductId,
        update: ProductUpdate,
    ) -> Result<Receipt, LifecycleError> {
        self.transition(
            id,
            Transition::Update {
                name: update.name,
                description: update.description,
                price: update.price,
                manufacturer: self.user().clone(),
                modified_at: update.modified_at,
            },
        )
        .await
    }

    /// Record the caller as the product's consumer. Status stays `Pending`.
    pub async fn order_product(
        &self,
        id: &ProductId,
        modified_at: Timestamp,
    ) -> Result<Receipt, LifecycleError> {
        self.transition(
            id,
            Transition::Order {
                consumer: self.user().clone(),
                modified_at,
            },
        )
        .await
    }

    pub async fn accept_order(
        &self,
        id: &ProductId,
        modified_at: Timestamp,
    ) -> Result<Receipt, LifecycleError> {
        self.transition(
            id,
            Transition::Accept {
                manufacturer: self.user().clone(),
                modified_at,
            },
        )
        .await
    }

    pub async fn ship_order(
        &self,
        id: &ProductId,
        modified_at: Timestamp,
    ) -> Result<Receipt, LifecycleError> {
        self.transition(id, Transition::Ship { modified_at }).await
    }

    pub async fn deliver_order(
        &self,
        id: &ProductId,
        modified_at: Timestamp,
    ) -> Result<Receipt, LifecycleError> {
        self.transition(
            id,
            Transition::Deliver {
                consumer: self.user().clone(),
                modified_at,
            },
        )
        .await
    }

    // ---- Queries ----

    pub async fn read_product(&self, id: &ProductId) -> Result<Product, LifecycleError> {
        self.query(Operation::ReadProduct, Some(id), &[id.to_string()])
            .await
    }

    /// Transition history, oldest first.
    pub async fn read_history(&self, id: &ProductId) -> Result<Vec<HistoryEntry>, LifecycleError> {
        self.query(Operation::TrackProductHistory, Some(id), &[id.to_string()])
            .await
    }

    pub async fn list_all(&self) -> Result<Vec<Product>, LifecycleError> {
        self.query(Operation::GetAllProducts, None, &[]).await
    }

    pub async fn list_by_manufacturer(
        &self,
        manufacturer: &UserId,
    ) -> Result<Vec<Product>, LifecycleError> {
        self.query(
            Operation::GetProductsByManufacturer,
            None,
            &[manufacturer.to_string()],
        )
        .await
    }

    pub async fn list_ordered_by_consumer(
        &self,
        consumer: &UserId,
    ) -> Result<Vec<Product>, LifecycleError> {
        self.query(
            Operation::GetConsumerOrderedProductList,
            None,
            &[consumer.to_string()],
        )
        .await
    }

    /// Products of `manufacturer` that have been ordered but not accepted.
    pub async fn list_order_requested(
        &self,
        manufacturer: &UserId,
    ) -> Result<Vec<Product>, LifecycleError> {
        self.query(
            Operation::GetOrderRequestedProductList,
            None,
            &[manufacturer.to_string()],
        )
        .await
    }

    pub async fn product_status(&self, id: &ProductId) -> Result<ProductStatus, LifecycleError> {
        self.query(Operation::GetProductStatus, Some(id), &[id.to_string()])
            .await
    }

    /// Whether a product with this id was ever created.
    pub async fn verify_product(&self, id: &ProductId) -> Result<bool, LifecycleError> {
        self.query(
            Operation::VerifyProductAuthenticity,
            Some(id),
            &[id.to_string()],
        )
        .await
    }

    // ---- Internals ----

    fn authorize(&self, operation: Operation) -> Result<(), LifecycleViolation> {
        match operation.required_org() {
            Some(required) if required != self.org() => {
                tracing::warn!(
                    function = operation.name(),
                    org = %self.org(),
                    user = %self.user(),
                    "operation refused for organization"
                );
                Err(LifecycleViolation::AccessDenied {
                    operation,
                    required,
                })
            }
            _ => Ok(()),
        }
    }

    async fn transition(
        &self,
        id: &ProductId,
        transition: Transition,
    ) -> Result<Receipt, LifecycleError> {
        let operation = transition.operation();
        self.authorize(operation)?;
        let current = self.read_product(id).await?;
        transition.apply(&current)?;

        let args = transition_args(id, &transition);
        let receipt = self.submit(operation, id, &args).await?;
        tracing::info!(
            function = operation.name(),
            product_id = %id,
            status = %receipt.product.status,
            actor = %self.user(),
            tx_id = %receipt.transaction_id,
            "product transition committed"
        );
        Ok(receipt)
    }

    async fn submit(
        &self,
        operation: Operation,
        id: &ProductId,
        args: &[String],
    ) -> Result<Receipt, LifecycleError> {
        let committed = self
            .contract
            .submit(operation.name(), args)
            .await
            .map_err(|e| LifecycleError::from_txn(Some(id), e))?;
        let product = decode(operation, &committed.payload)?;
        Ok(Receipt {
            transaction_id: committed.transaction_id,
            product,
        })
    }

    async fn query<T: DeserializeOwned>(
        &self,
        operation: Operation,
        id: Option<&ProductId>,
        args: &[String],
    ) -> Result<T, LifecycleError> {
        let bytes = self
            .contract
            .evaluate(operation.name(), args)
            .await
            .map_err(|e| LifecycleError::from_query(id, e))?;
        decode(operation, &bytes)
    }
}

/// Positional contract arguments for a transition.
fn transition_args(id: &ProductId, transition: &Transition) -> Vec<String> {
    let mut args = vec![id.to_string()];
    match transition {
        Transition::Update {
            name,
            description,
            price,
            manufacturer,
            ..
        } => {
            args.push(name.clone());
            args.push(description.clone());
            args.push(price.to_string());
            args.push(manufacturer.to_string());
        }
        Transition::Order { consumer, .. } | Transition::Deliver { consumer, .. } => {
            args.push(consumer.to_string());
        }
        Transition::Accept { manufacturer, .. } => args.push(manufacturer.to_string()),
        Transition::Ship { .. } => {}
    }
    args.push(transition.modified_at().to_iso8601());
    args
}

fn decode<T: DeserializeOwned>(operation: Operation, bytes: &[u8]) -> Result<T, LifecycleError> {
    serde_json::from_slice(bytes).map_err(|e| LifecycleError::Payload {
        function: operation.name(),
        reason: e.to_string(),
    })
}
