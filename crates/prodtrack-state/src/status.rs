//! Product status.

use serde::{Deserialize, Serialize};

/// Where a product is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProductStatus {
    /// Created, possibly ordered, not yet accepted.
    Pending,
    /// Order accepted by the manufacturer.
    Accepted,
    /// Handed to the carrier.
    Shipped,
    /// Received by the consumer. Terminal state.
    Delivered,
}

impl ProductStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [ProductStatus; 4] = [
        Self::Pending,
        Self::Accepted,
        Self::Shipped,
        Self::Delivered,
    ];

    /// Whether this is a terminal state (no further transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered)
    }

    /// The canonical string name, as stored on the ledger.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Accepted => "Accepted",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
        }
    }

    /// The status reached by one forward step, if any.
    pub fn next(&self) -> Option<ProductStatus> {
        match self {
            Self::Pending => Some(Self::Accepted),
            Self::Accepted => Some(Self::Shipped),
            Self::Shipped => Some(Self::Delivered),
            Self::Delivered => None,
        }
    }
}

impl std::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProductStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown product status: {s:?}"))
    }
}
