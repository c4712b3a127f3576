//! # Transition Table
//!
//! [`Transition::apply`] is the single definition of what each mutating
//! operation may do to a product. It never mutates in place: it returns
//! the product as it would be after the transition, or the rule that
//! forbids it.
//!
//! | Transition | From | Guard | To |
//! |------------|------|-------|----|
//! | Update  | Pending  | actor is the manufacturer, not yet ordered | Pending |
//! | Order   | Pending  | no consumer yet                            | Pending, consumer set |
//! | Accept  | Pending  | consumer set, actor is the manufacturer    | Accepted |
//! | Ship    | Accepted | —                                          | Shipped |
//! | Deliver | Shipped  | actor is the recorded consumer             | Delivered |

use prodtrack_core::{Timestamp, UserId};

use crate::error::LifecycleViolation;
use crate::operation::Operation;
use crate::product::{Price, Product};
use crate::status::ProductStatus;

/// A requested change to an existing product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Update {
        name: String,
        description: String,
        price: Price,
        manufacturer: UserId,
        modified_at: Timestamp,
    },
    Order {
        consumer: UserId,
        modified_at: Timestamp,
    },
    Accept {
        manufacturer: UserId,
        modified_at: Timestamp,
    },
    Ship {
        modified_at: Timestamp,
    },
    Deliver {
        consumer: UserId,
        modified_at: Timestamp,
    },
}

impl Transition {
    /// The contract function that enacts this transition.
    pub fn operation(&self) -> Operation {
        match self {
            Self::Update { .. } => Operation::UpdateProduct,
            Self::Order { .. } => Operation::ProductOrder,
            Self::Accept { .. } => Operation::ProductAccept,
            Self::Ship { .. } => Operation::ProductShip,
            Self::Deliver { .. } => Operation::ProductDeliver,
        }
    }

    /// Modification time carried by the transition.
    pub fn modified_at(&self) -> Timestamp {
        match self {
            Self::Update { modified_at, .. }
            | Self::Order { modified_at, .. }
            | Self::Accept { modified_at, .. }
            | Self::Ship { modified_at }
            | Self::Deliver { modified_at, .. } => *modified_at,
        }
    }

    /// Status the product ends up in.
    pub fn target_status(&self, current: ProductStatus) -> ProductStatus {
        match self {
            Self::Update { .. } | Self::Order { .. } => current,
            Self::Accept { .. } => ProductStatus::Accepted,
            Self::Ship { .. } => ProductStatus::Shipped,
            Self::Deliver { .. } => ProductStatus::Delivered,
        }
    }

    /// Check the transition against `product` and return the result.
    pub fn apply(&self, product: &Product) -> Result<Product, LifecycleViolation> {
        if product.status.is_terminal() {
            return Err(LifecycleViolation::AlreadyTerminal {
                status: product.status,
            });
        }

        let mut next = product.clone();
        match self {
            Self::Update {
                name,
                description,
                price,
                manufacturer,
                ..
            } => {
                require_status(product, ProductStatus::Pending, ProductStatus::Pending)?;
                require_manufacturer(product, manufacturer)?;
                if let Some(consumer) = &product.consumer {
                    return Err(LifecycleViolation::AlreadyOrdered {
                        consumer: consumer.clone(),
                    });
                }
                next.name = name.clone();
                next.description = description.clone();
                next.price = price.clone();
            }
            Self::Order { consumer, .. } => {
                require_status(product, ProductStatus::Pending, ProductStatus::Pending)?;
                if let Some(existing) = &product.consumer {
                    return Err(LifecycleViolation::AlreadyOrdered {
                        consumer: existing.clone(),
                    });
                }
                next.consumer = Some(consumer.clone());
            }
            Self::Accept { manufacturer, .. } => {
                require_status(product, ProductStatus::Pending, ProductStatus::Accepted)?;
                if product.consumer.is_none() {
                    return Err(LifecycleViolation::NotOrdered);
                }
                require_manufacturer(product, manufacturer)?;
                next.status = ProductStatus::Accepted;
            }
            Self::Ship { .. } => {
                require_status(product, ProductStatus::Accepted, ProductStatus::Shipped)?;
                next.status = ProductStatus::Shipped;
            }
            Self::Deliver {
                consumer,
                modified_at,
            } => {
                require_status(product, ProductStatus::Shipped, ProductStatus::Delivered)?;
                match &product.consumer {
                    Some(expected) if expected == consumer => {}
                    Some(expected) => {
                        return Err(LifecycleViolation::NotConsumer {
                            expected: expected.clone(),
                            actual: consumer.clone(),
                        })
                    }
                    None => return Err(LifecycleViolation::NotOrdered),
                }
                next.status = ProductStatus::Delivered;
                next.delivered_date = Some(*modified_at);
            }
        }
        next.modified_date = Some(self.modified_at());
        Ok(next)
    }
}

fn require_status(
    product: &Product,
    expected: ProductStatus,
    to: ProductStatus,
) -> Result<(), LifecycleViolation> {
    if product.status != expected {
        return Err(LifecycleViolation::InvalidTransition {
            from: product.status,
            to,
        });
    }
    Ok(())
}

fn require_manufacturer(product: &Product, actor: &UserId) -> Result<(), LifecycleViolation> {
    if &product.manufacturer != actor {
        return Err(LifecycleViolation::NotManufacturer {
            expected: product.manufacturer.clone(),
            actual: actor.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use prodtrack_core::ProductId;

    fn ts(day: u32) -> Timestamp {
        Timestamp::parse(&format!("2024-03-{day:02}T12:00:00Z")).unwrap()
    }

    fn user(name: &str) -> UserId {
        UserId::new(name).unwrap()
    }

    fn fresh() -> Product {
        Product::new(
            ProductId::parse("p-1").unwrap(),
            "Widget",
            "Blue",
            Price::parse("10").unwrap(),
            user("acme"),
            ts(1),
        )
    }

    fn order(consumer: &str) -> Transition {
        Transition::Order {
            consumer: user(consumer),
            modified_at: ts(2),
        }
    }

    fn accept(manufacturer: &str) -> Transition {
        Transition::Accept {
            manufacturer: user(manufacturer),
            modified_at: ts(3),
        }
    }

    fn ship() -> Transition {
        Transition::Ship { modified_at: ts(4) }
    }

    fn deliver(consumer: &str) -> Transition {
        Transition::Deliver {
            consumer: user(consumer),
            modified_at: ts(5),
        }
    }

    #[test]
    fn test_happy_path() {
        let p = fresh();
        let p = order("bob").apply(&p).unwrap();
        assert_eq!(p.status, ProductStatus::Pending);
        assert_eq!(p.consumer, Some(user("bob")));
        assert!(p.is_order_requested());

        let p = accept("acme").apply(&p).unwrap();
        assert_eq!(p.status, ProductStatus::Accepted);
        let p = ship().apply(&p).unwrap();
        assert_eq!(p.status, ProductStatus::Shipped);
        let p = deliver("bob").apply(&p).unwrap();
        assert_eq!(p.status, ProductStatus::Delivered);
        assert_eq!(p.delivered_date, Some(ts(5)));
        assert_eq!(p.modified_date, Some(ts(5)));
        assert_eq!(p.created_date, ts(1));
    }

    #[test]
    fn test_accept_without_order_rejected() {
        let p = fresh();
        assert_eq!(accept("acme").apply(&p), Err(LifecycleViolation::NotOrdered));
    }

    #[test]
    fn test_second_order_rejected() {
        let p = order("bob").apply(&fresh()).unwrap();
        assert_eq!(
            order("carol").apply(&p),
            Err(LifecycleViolation::AlreadyOrdered {
                consumer: user("bob")
            })
        );
    }

    #[test]
    fn test_accept_by_other_manufacturer_rejected() {
        let p = order("bob").apply(&fresh()).unwrap();
        assert!(matches!(
            accept("globex").apply(&p),
            Err(LifecycleViolation::NotManufacturer { .. })
        ));
    }

    #[test]
    fn test_ship_requires_accepted() {
        let p = order("bob").apply(&fresh()).unwrap();
        assert_eq!(
            ship().apply(&p),
            Err(LifecycleViolation::InvalidTransition {
                from: ProductStatus::Pending,
                to: ProductStatus::Shipped
            })
        );
    }

    #[test]
    fn test_deliver_by_other_consumer_rejected() {
        let p = order("bob").apply(&fresh()).unwrap();
        let p = accept("acme").apply(&p).unwrap();
        let p = ship().apply(&p).unwrap();
        assert!(matches!(
            deliver("mallory").apply(&p),
            Err(LifecycleViolation::NotConsumer { .. })
        ));
    }

    #[test]
    fn test_delivered_is_terminal() {
        let p = order("bob").apply(&fresh()).unwrap();
        let p = accept("acme").apply(&p).unwrap();
        let p = ship().apply(&p).unwrap();
        let p = deliver("bob").apply(&p).unwrap();
        for t in [order("x"), accept("acme"), ship(), deliver("bob")] {
            assert_eq!(
                t.apply(&p),
                Err(LifecycleViolation::AlreadyTerminal {
                    status: ProductStatus::Delivered
                })
            );
        }
    }

    #[test]
    fn test_update_changes_descriptive_fields_only() {
        let update = Transition::Update {
            name: "Gadget".into(),
            description: "Red".into(),
            price: Price::parse("12.50").unwrap(),
            manufacturer: user("acme"),
            modified_at: ts(2),
        };
        let p = update.apply(&fresh()).unwrap();
        assert_eq!(p.name, "Gadget");
        assert_eq!(p.price.as_str(), "12.50");
        assert_eq!(p.status, ProductStatus::Pending);
        assert_eq!(p.modified_date, Some(ts(2)));
        assert_eq!(p.id, fresh().id);
    }

    #[test]
    fn test_update_after_order_rejected() {
        let p = order("bob").apply(&fresh()).unwrap();
        let update = Transition::Update {
            name: "Gadget".into(),
            description: "Red".into(),
            price: Price::parse("1").unwrap(),
            manufacturer: user("acme"),
            modified_at: ts(3),
        };
        assert!(matches!(
            update.apply(&p),
            Err(LifecycleViolation::AlreadyOrdered { .. })
        ));
    }

    #[test]
    fn test_apply_leaves_input_untouched() {
        let p = fresh();
        let _ = order("bob").apply(&p).unwrap();
        assert_eq!(p, fresh());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_transition() -> impl Strategy<Value = Transition> {
            let who = prop::sample::select(vec!["acme", "bob", "carol"]);
            prop_oneof![
                who.clone().prop_map(|c| order(c)),
                who.clone().prop_map(|m| accept(m)),
                Just(ship()),
                who.prop_map(|c| deliver(c)),
            ]
        }

        proptest! {
            #[test]
            fn status_never_moves_backwards(steps in prop::collection::vec(arb_transition(), 0..24)) {
                let mut product = fresh();
                for step in steps {
                    let before = product.clone();
                    if let Ok(after) = step.apply(&product) {
                        prop_assert!(after.status >= before.status);
                        prop_assert!(!before.status.is_terminal());
                        prop_assert_eq!(&after.manufacturer, &before.manufacturer);
                        if before.consumer.is_some() {
                            prop_assert_eq!(&after.consumer, &before.consumer);
                        }
                        if after.status != before.status {
                            prop_assert_eq!(before.status.next(), Some(after.status));
                        }
                        product = after;
                    }
                }
            }

            #[test]
            fn accepted_products_always_have_a_consumer(steps in prop::collection::vec(arb_transition(), 0..24)) {
                let mut product = fresh();
                for step in steps {
                    if let Ok(after) = step.apply(&product) {
                        product = after;
                    }
                    if product.status != ProductStatus::Pending {
                        prop_assert!(product.consumer.is_some());
                    }
                }
            }
        }
    }
}
