//! # Product Records
//!
//! The ledger document for one product and the history snapshots taken at
//! each transition. Field names match the ledger JSON (`ID`, `Name`,
//! `CreatedDate`, ...); optional fields are `null` until set.

use serde::{Deserialize, Serialize};

use prodtrack_core::{ProductId, Timestamp, UserId, ValidationError};

use crate::status::ProductStatus;

/// A non-negative decimal price, kept as the string the caller supplied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Price(String);

impl Price {
    /// Validate `value` as `digits[.digits]`.
    pub fn parse(value: impl AsRef<str>) -> Result<Self, ValidationError> {
        let value = value.as_ref().trim();
        let invalid = |reason: &'static str| ValidationError::InvalidPrice {
            value: value.to_string(),
            reason,
        };
        if value.is_empty() {
            return Err(invalid("empty"));
        }
        let (whole, frac) = match value.split_once('.') {
            Some((whole, frac)) => (whole, Some(frac)),
            None => (value, None),
        };
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("expected a non-negative decimal number"));
        }
        if let Some(frac) = frac {
            if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid("malformed fractional part"));
            }
        }
        if value.len() > 32 {
            return Err(invalid("too long"));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(raw).map_err(serde::de::Error::custom)
    }
}

/// A product as stored on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Product {
    #[serde(rename = "ID")]
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Price,
    pub status: ProductStatus,
    pub manufacturer: UserId,
    pub consumer: Option<UserId>,
    pub created_date: Timestamp,
    pub modified_date: Option<Timestamp>,
    pub delivered_date: Option<Timestamp>,
}

impl Product {
    /// A freshly created product: `Pending`, no consumer.
    pub fn new(
        id: ProductId,
        name: impl Into<String>,
        description: impl Into<String>,
        price: Price,
        manufacturer: UserId,
        created_date: Timestamp,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
            price,
            status: ProductStatus::Pending,
            manufacturer,
            consumer: None,
            created_date,
            modified_date: None,
            delivered_date: None,
        }
    }

    /// Ordered but not yet accepted.
    pub fn is_order_requested(&self) -> bool {
        self.status == ProductStatus::Pending && self.consumer.is_some()
    }
}

/// Snapshot of a product taken when a transition was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HistoryEntry {
    /// Ledger transaction that applied the transition.
    pub tx_id: String,
    /// Modification time carried by the transition.
    pub timestamp: Timestamp,
    /// User who invoked the transition.
    pub actor: UserId,
    /// The product after the transition.
    pub value: Product,
}
