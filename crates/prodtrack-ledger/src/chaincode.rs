//! # Product Contract
//!
//! The ledger-side logic: a world state of products keyed by id, each with
//! its append-only transition history. Every mutation validates through the
//! shared [`Transition`] table and writes the new state together with its
//! history entry while holding the key's shard lock, so a transition and
//! its history append are never observed apart.
//!
//! Access control follows the organization table on [`Operation`]; acting
//! users named in the arguments must be the caller.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;

use prodtrack_core::{Organization, ProductId, Timestamp, UserId};
use prodtrack_state::{
    HistoryEntry, LifecycleViolation, Operation, Price, Product, ProductStatus, Transition,
};

use crate::error::{ContractError, ErrorCode};

/// The identity invoking a contract function, as proven to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub org: Organization,
    pub user: UserId,
}

impl Caller {
    pub fn new(org: Organization, user: UserId) -> Self {
        Self { org, user }
    }
}

#[derive(Debug, Clone)]
struct ProductRecord {
    current: Product,
    history: Vec<HistoryEntry>,
}

/// In-process product contract and world state.
#[derive(Debug, Default)]
pub struct ProductContract {
    state: DashMap<ProductId, ProductRecord>,
}

impl ProductContract {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of products in the world state.
    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// Execute a mutating function as `caller` under transaction `tx_id`.
    /// Returns the product JSON after the change.
    pub fn submit(
        &self,
        caller: &Caller,
        function: &str,
        args: &[String],
        tx_id: &str,
    ) -> Result<Vec<u8>, ContractError> {
        let op = lookup(function)?;
        if !op.is_mutation() {
            return Err(ContractError::bad_request(format!(
                "{op} is a query; evaluate it instead"
            )));
        }
        check_arity(op, args)?;
        authorize(op, caller)?;

        let product = match op {
            Operation::CreateProduct => self.create(caller, args)?,
            _ => {
                let id = ProductId::parse(&args[0])?;
                let transition = parse_transition(op, args)?;
                check_actor(op, caller, &transition)?;
                self.transition(&id, &transition, caller, tx_id)?
            }
        };
        tracing::debug!(
            function = op.name(),
            product_id = %product.id,
            status = %product.status,
            tx_id,
            "contract transaction applied"
        );
        to_json(&product)
    }

    /// Execute a read-only function.
    pub fn evaluate(
        &self,
        _caller: &Caller,
        function: &str,
        args: &[String],
    ) -> Result<Vec<u8>, ContractError> {
        let op = lookup(function)?;
        if op.is_mutation() {
            return Err(ContractError::bad_request(format!(
                "{op} changes state; submit it instead"
            )));
        }
        check_arity(op, args)?;

        match op {
            Operation::ReadProduct => to_json(&self.read(&ProductId::parse(&args[0])?)?),
            Operation::TrackProductHistory => {
                let id = ProductId::parse(&args[0])?;
                let record = self.state.get(&id).ok_or_else(|| missing(&id))?;
                to_json(&record.history)
            }
            Operation::GetAllProducts => to_json(&self.select(|_| true)),
            Operation::GetProductsByManufacturer => {
                let m = &args[0];
                to_json(&self.select(|p| p.manufacturer.as_str() == m))
            }
            Operation::GetConsumerOrderedProductList => {
                let c = &args[0];
                to_json(&self.select(|p| {
                    p.consumer.as_ref().map(UserId::as_str) == Some(c.as_str())
                }))
            }
            Operation::GetOrderRequestedProductList => {
                let m = &args[0];
                to_json(&self.select(|p| {
                    p.is_order_requested() && p.manufacturer.as_str() == m
                }))
            }
            Operation::GetProductStatus => {
                to_json(&self.read(&ProductId::parse(&args[0])?)?.status)
            }
            Operation::VerifyProductAuthenticity => {
                let id = ProductId::parse(&args[0])?;
                to_json(&self.state.contains_key(&id))
            }
            _ => Err(ContractError::bad_request(format!("{op} is not a query"))),
        }
    }

    fn create(&self, caller: &Caller, args: &[String]) -> Result<Product, ContractError> {
        let id = ProductId::parse(&args[0])?;
        let manufacturer = UserId::new(args[4].as_str())?;
        if manufacturer != caller.user {
            return Err(actor_mismatch(caller, "manufacturer", &manufacturer));
        }
        let product = Product::new(
            id.clone(),
            non_blank(&args[1], "name")?,
            args[2].clone(),
            Price::parse(&args[3])?,
            manufacturer,
            Timestamp::parse(&args[5])?,
        );
        match self.state.entry(id) {
            Entry::Occupied(e) => Err(ContractError::new(
                ErrorCode::Conflict,
                format!("the product {} already exists", e.key()),
            )),
            Entry::Vacant(e) => {
                e.insert(ProductRecord {
                    current: product.clone(),
                    history: Vec::new(),
                });
                Ok(product)
            }
        }
    }

    fn transition(
        &self,
        id: &ProductId,
        transition: &Transition,
        caller: &Caller,
        tx_id: &str,
    ) -> Result<Product, ContractError> {
        let mut record = self.state.get_mut(id).ok_or_else(|| missing(id))?;
        let next = transition.apply(&record.current)?;
        record.history.push(HistoryEntry {
            tx_id: tx_id.to_string(),
            timestamp: transition.modified_at(),
            actor: caller.user.clone(),
            value: next.clone(),
        });
        record.current = next.clone();
        Ok(next)
    }

    fn read(&self, id: &ProductId) -> Result<Product, ContractError> {
        self.state
            .get(id)
            .map(|r| r.current.clone())
            .ok_or_else(|| missing(id))
    }

    fn select(&self, pred: impl Fn(&Product) -> bool) -> Vec<Product> {
        let mut products: Vec<Product> = self
            .state
            .iter()
            .filter(|r| pred(&r.current))
            .map(|r| r.current.clone())
            .collect();
        products.sort_by(|a, b| {
            a.created_date
                .cmp(&b.created_date)
                .then_with(|| a.id.cmp(&b.id))
        });
        products
    }
}

fn lookup(function: &str) -> Result<Operation, ContractError> {
    Operation::from_name(function)
        .ok_or_else(|| ContractError::bad_request(format!("unknown contract function {function:?}")))
}

fn check_arity(op: Operation, args: &[String]) -> Result<(), ContractError> {
    if args.len() != op.arity() {
        return Err(ContractError::bad_request(format!(
            "{op} takes {} argument(s), got {}",
            op.arity(),
            args.len()
        )));
    }
    Ok(())
}

fn authorize(op: Operation, caller: &Caller) -> Result<(), ContractError> {
    match op.required_org() {
        Some(required) if required != caller.org => Err(LifecycleViolation::AccessDenied {
            operation: op,
            required,
        }
        .into()),
        _ => Ok(()),
    }
}

fn parse_transition(op: Operation, args: &[String]) -> Result<Transition, ContractError> {
    let transition = match op {
        Operation::UpdateProduct => Transition::Update {
            name: non_blank(&args[1], "name")?,
            description: args[2].clone(),
            price: Price::parse(&args[3])?,
            manufacturer: UserId::new(args[4].as_str())?,
            modified_at: Timestamp::parse(&args[5])?,
        },
        Operation::ProductOrder => Transition::Order {
            consumer: UserId::new(args[1].as_str())?,
            modified_at: Timestamp::parse(&args[2])?,
        },
        Operation::ProductAccept => Transition::Accept {
            manufacturer: UserId::new(args[1].as_str())?,
            modified_at: Timestamp::parse(&args[2])?,
        },
        Operation::ProductShip => Transition::Ship {
            modified_at: Timestamp::parse(&args[1])?,
        },
        Operation::ProductDeliver => Transition::Deliver {
            consumer: UserId::new(args[1].as_str())?,
            modified_at: Timestamp::parse(&args[2])?,
        },
        other => {
            return Err(ContractError::bad_request(format!(
                "{other} is not a transition"
            )))
        }
    };
    Ok(transition)
}

/// The user a transition names as its actor must be the caller.
fn check_actor(op: Operation, caller: &Caller, transition: &Transition) -> Result<(), ContractError> {
    let (role, named) = match transition {
        Transition::Update { manufacturer, .. } | Transition::Accept { manufacturer, .. } => {
            ("manufacturer", manufacturer)
        }
        Transition::Order { consumer, .. } | Transition::Deliver { consumer, .. } => {
            ("consumer", consumer)
        }
        Transition::Ship { .. } => return Ok(()),
    };
    if named != &caller.user {
        tracing::warn!(function = op.name(), caller = %caller.user, named = %named, "actor mismatch");
        return Err(actor_mismatch(caller, role, named));
    }
    Ok(())
}

fn actor_mismatch(caller: &Caller, role: &str, named: &UserId) -> ContractError {
    ContractError::access_denied(format!(
        "caller {} cannot act as {role} {named}",
        caller.user
    ))
}

fn non_blank(value: &str, field: &'static str) -> Result<String, ContractError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ContractError::bad_request(format!("{field} is missing")));
    }
    Ok(trimmed.to_string())
}

fn missing(id: &ProductId) -> ContractError {
    ContractError::not_found(format!("the product {id} does not exist"))
}

fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>, ContractError> {
    serde_json::to_vec(value)
        .map_err(|e| ContractError::bad_request(format!("cannot encode result: {e}")))
}

/// Decode a `GetProductStatus` result.
pub fn decode_status(bytes: &[u8]) -> Result<ProductStatus, ContractError> {
    serde_json::from_slice(bytes)
        .map_err(|e| ContractError::bad_request(format!("malformed status: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CREATED: &str = "2024-03-01T09:00:00Z";

    fn manufacturer() -> Caller {
        Caller::new(Organization::Org1, UserId::new("acme").unwrap())
    }

    fn consumer() -> Caller {
        Caller::new(Organization::Org2, UserId::new("bob").unwrap())
    }

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn create(contract: &ProductContract, id: &str) -> Product {
        let bytes = contract
            .submit(
                &manufacturer(),
                "CreateProduct",
                &args(&[id, "Widget", "Blue", "10", "acme", CREATED]),
                "tx-create",
            )
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn submit(
        contract: &ProductContract,
        caller: &Caller,
        function: &str,
        a: &[&str],
    ) -> Result<Product, ContractError> {
        let tx = format!("tx-{function}");
        contract
            .submit(caller, function, &args(a), &tx)
            .map(|b| serde_json::from_slice(&b).unwrap())
    }

    fn run_to_delivered(contract: &ProductContract, id: &str) {
        create(contract, id);
        submit(contract, &consumer(), "ProductOrder", &[id, "bob", "2024-03-02T00:00:00Z"]).unwrap();
        submit(contract, &manufacturer(), "ProductAccept", &[id, "acme", "2024-03-03T00:00:00Z"]).unwrap();
        submit(contract, &manufacturer(), "ProductShip", &[id, "2024-03-04T00:00:00Z"]).unwrap();
        submit(contract, &consumer(), "ProductDeliver", &[id, "bob", "2024-03-05T00:00:00Z"]).unwrap();
    }

    #[test]
    fn test_create_and_read() {
        let contract = ProductContract::new();
        let created = create(&contract, "p1");
        assert_eq!(created.status, ProductStatus::Pending);
        let bytes = contract
            .evaluate(&consumer(), "ReadProduct", &args(&["p1"]))
            .unwrap();
        let read: Product = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(read, created);
    }

    #[test]
    fn test_duplicate_create_conflicts() {
        let contract = ProductContract::new();
        create(&contract, "p1");
        let err = submit(
            &contract,
            &manufacturer(),
            "CreateProduct",
            &["p1", "Other", "x", "1", "acme", CREATED],
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[test]
    fn test_create_restricted_to_org1() {
        let contract = ProductContract::new();
        let err = submit(
            &contract,
            &consumer(),
            "CreateProduct",
            &["p1", "Widget", "Blue", "10", "bob", CREATED],
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::AccessDenied);
        assert_eq!(
            err.message,
            "Access denied: Only peers in Org1MSP are allowed to execute CreateProduct"
        );
        assert!(contract.is_empty());
    }

    #[test]
    fn test_order_restricted_to_org2() {
        let contract = ProductContract::new();
        create(&contract, "p1");
        let err = submit(
            &contract,
            &manufacturer(),
            "ProductOrder",
            &["p1", "acme", "2024-03-02T00:00:00Z"],
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::AccessDenied);
    }

    #[test]
    fn test_actor_must_be_caller() {
        let contract = ProductContract::new();
        create(&contract, "p1");
        let err = submit(
            &contract,
            &consumer(),
            "ProductOrder",
            &["p1", "carol", "2024-03-02T00:00:00Z"],
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::AccessDenied);
    }

    #[test]
    fn test_full_lifecycle_history() {
        let contract = ProductContract::new();
        run_to_delivered(&contract, "p1");
        let bytes = contract
            .evaluate(&manufacturer(), "TrackProductHistory", &args(&["p1"]))
            .unwrap();
        let history: Vec<HistoryEntry> = serde_json::from_slice(&bytes).unwrap();
        let tx_ids: Vec<&str> = history.iter().map(|h| h.tx_id.as_str()).collect();
        assert_eq!(
            tx_ids,
            vec!["tx-ProductOrder", "tx-ProductAccept", "tx-ProductShip", "tx-ProductDeliver"]
        );
        let statuses: Vec<ProductStatus> = history.iter().map(|h| h.value.status).collect();
        assert_eq!(
            statuses,
            vec![
                ProductStatus::Pending,
                ProductStatus::Accepted,
                ProductStatus::Shipped,
                ProductStatus::Delivered
            ]
        );
        assert_eq!(history[0].actor.as_str(), "bob");
        assert_eq!(history[1].actor.as_str(), "acme");
    }

    #[test]
    fn test_rejected_transition_leaves_state_and_history() {
        let contract = ProductContract::new();
        create(&contract, "p1");
        let err = submit(
            &contract,
            &manufacturer(),
            "ProductAccept",
            &["p1", "acme", "2024-03-02T00:00:00Z"],
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTransition);
        let status = contract
            .evaluate(&manufacturer(), "GetProductStatus", &args(&["p1"]))
            .unwrap();
        assert_eq!(decode_status(&status).unwrap(), ProductStatus::Pending);
        let history = contract
            .evaluate(&manufacturer(), "TrackProductHistory", &args(&["p1"]))
            .unwrap();
        assert_eq!(history, b"[]");
    }

    #[test]
    fn test_unknown_product_not_found() {
        let contract = ProductContract::new();
        for function in ["ReadProduct", "TrackProductHistory", "GetProductStatus"] {
            let err = contract
                .evaluate(&consumer(), function, &args(&["nope"]))
                .unwrap_err();
            assert_eq!(err.code, ErrorCode::NotFound, "{function}");
        }
        let err = submit(&contract, &manufacturer(), "ProductShip", &["nope", CREATED]).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
        let verified = contract
            .evaluate(&consumer(), "VerifyProductAuthenticity", &args(&["nope"]))
            .unwrap();
        assert_eq!(verified, b"false");
    }

    #[test]
    fn test_list_queries() {
        let contract = ProductContract::new();
        create(&contract, "p1");
        create(&contract, "p2");
        submit(&contract, &consumer(), "ProductOrder", &["p2", "bob", "2024-03-02T00:00:00Z"]).unwrap();

        let list = |function: &str, a: &[&str]| -> Vec<String> {
            let bytes = contract.evaluate(&consumer(), function, &args(a)).unwrap();
            let products: Vec<Product> = serde_json::from_slice(&bytes).unwrap();
            products.into_iter().map(|p| p.id.to_string()).collect()
        };
        assert_eq!(list("GetAllProducts", &[]), vec!["p1", "p2"]);
        assert_eq!(list("GetProductsByManufacturer", &["acme"]), vec!["p1", "p2"]);
        assert_eq!(list("GetProductsByManufacturer", &["globex"]), Vec::<String>::new());
        assert_eq!(list("GetConsumerOrderedProductList", &["bob"]), vec!["p2"]);
        assert_eq!(list("GetOrderRequestedProductList", &["acme"]), vec!["p2"]);
    }

    #[test]
    fn test_bad_arguments() {
        let contract = ProductContract::new();
        let err = submit(&contract, &manufacturer(), "CreateProduct", &["p1"]).unwrap_err();
        assert_eq!(err.code, ErrorCode::BadRequest);
        let err = submit(
            &contract,
            &manufacturer(),
            "CreateProduct",
            &["p1", "Widget", "Blue", "ten", "acme", CREATED],
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::BadRequest);
        let err = contract
            .evaluate(&consumer(), "DropTables", &[])
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BadRequest);
        let err = contract
            .evaluate(&manufacturer(), "CreateProduct", &args(&["p1", "a", "b", "1", "acme", CREATED]))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BadRequest);
    }

    #[test]
    fn test_concurrent_orders_single_winner() {
        let contract = std::sync::Arc::new(ProductContract::new());
        create(&contract, "p1");
        let handles: Vec<_> = ["bob", "carol", "dave", "erin"]
            .into_iter()
            .map(|name| {
                let contract = contract.clone();
                std::thread::spawn(move || {
                    let caller = Caller::new(Organization::Org2, UserId::new(name).unwrap());
                    contract
                        .submit(
                            &caller,
                            "ProductOrder",
                            &args(&["p1", name, "2024-03-02T00:00:00Z"]),
                            name,
                        )
                        .is_ok()
                })
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(winners, 1);
        let history = contract
            .evaluate(&consumer(), "TrackProductHistory", &args(&["p1"]))
            .unwrap();
        let history: Vec<HistoryEntry> = serde_json::from_slice(&history).unwrap();
        assert_eq!(history.len(), 1);
    }
}
