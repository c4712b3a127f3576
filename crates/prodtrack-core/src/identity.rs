//! # Domain Identity Newtypes
//!
//! Organizations, users, and products each get their own type. You cannot
//! hand a `UserId` to something expecting a `ProductId`, and an
//! organization is always one of the two network members.
//!
//! ## Organization aliases
//!
//! | Input                                 | Resolves to |
//! |---------------------------------------|-------------|
//! | `manufacturer`, `org1`, `Org1MSP`     | `Org1`      |
//! | `consumer`, `org2`, `Org2MSP`         | `Org2`      |
//!
//! Matching is case-insensitive. Anything else is rejected rather than
//! silently falling into one of the organizations.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ValidationError;
use crate::temporal::Timestamp;

/// User id of the bootstrap administrator in every organization's keystore.
pub const ADMIN_USER: &str = "admin";

const MAX_USER_ID_LEN: usize = 64;
const MAX_PRODUCT_ID_LEN: usize = 128;

/// A member organization of the ledger network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Organization {
    /// The manufacturing organization (`Org1MSP`).
    Org1,
    /// The consuming organization (`Org2MSP`).
    Org2,
}

impl Organization {
    /// Every organization, in a stable order.
    pub const ALL: [Organization; 2] = [Organization::Org1, Organization::Org2];

    /// Resolve a request-facing organization name or alias.
    pub fn resolve(name: &str) -> Result<Self, ValidationError> {
        let trimmed = name.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "manufacturer" | "org1" | "org1msp" => Ok(Self::Org1),
            "consumer" | "org2" | "org2msp" => Ok(Self::Org2),
            "" => Err(ValidationError::MissingField("orgName")),
            _ => Err(ValidationError::UnknownOrganization(trimmed.to_string())),
        }
    }

    /// Resolve a membership service provider id (`Org1MSP`, `Org2MSP`).
    pub fn from_msp_id(msp_id: &str) -> Option<Self> {
        match msp_id {
            "Org1MSP" => Some(Self::Org1),
            "Org2MSP" => Some(Self::Org2),
            _ => None,
        }
    }

    /// Short lowercase name used in paths and affiliations.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Org1 => "org1",
            Self::Org2 => "org2",
        }
    }

    /// Membership service provider id carried in certificates.
    pub fn msp_id(&self) -> &'static str {
        match self {
            Self::Org1 => "Org1MSP",
            Self::Org2 => "Org2MSP",
        }
    }

    /// Host name of the organization's enrollment authority.
    pub fn ca_host(&self) -> String {
        format!("ca.{}.example.com", self.as_str())
    }

    /// Affiliation new end users are registered under.
    pub fn default_affiliation(&self) -> String {
        format!("{}.department1", self.as_str())
    }
}

impl std::fmt::Display for Organization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Organization {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::resolve(s)
    }
}

/// A user name within one organization.
///
/// Restricted to ASCII alphanumerics and `. _ - @` so it is safe to use as
/// a keystore file name and as a positional ledger argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Validate and wrap a user name.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let reject = |reason| ValidationError::InvalidUserId {
            value: value.clone(),
            reason,
        };
        if value.is_empty() {
            return Err(reject("must not be empty"));
        }
        if value.len() > MAX_USER_ID_LEN {
            return Err(reject("longer than 64 characters"));
        }
        if value.starts_with('.') {
            return Err(reject("must not start with '.'"));
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '@'))
        {
            return Err(reject("only ASCII letters, digits and . _ - @ are allowed"));
        }
        Ok(Self(value))
    }

    /// The bootstrap administrator of an organization.
    pub fn admin() -> Self {
        Self(ADMIN_USER.to_string())
    }

    /// Borrow the raw user name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

/// Ledger key of a product.
///
/// Fresh ids are the SHA-256 of the manufacturer, name, description and
/// creation time, salted with a 128-bit random nonce so two identical
/// submissions in the same second still get distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Derive a new id for a product about to be created.
    pub fn generate(
        manufacturer: &UserId,
        name: &str,
        description: &str,
        created_at: Timestamp,
    ) -> Self {
        let nonce = uuid::Uuid::new_v4();
        let mut hasher = Sha256::new();
        for part in [manufacturer.as_str(), name, description] {
            hasher.update(part.as_bytes());
            hasher.update([0x1f]);
        }
        hasher.update(created_at.epoch_secs().to_be_bytes());
        hasher.update(nonce.as_bytes());
        let digest = hasher.finalize();
        Self(digest.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Accept an id supplied by a caller or read back from the ledger.
    pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        let reject = |reason| ValidationError::InvalidProductId {
            value: value.clone(),
            reason,
        };
        if trimmed.is_empty() {
            return Err(reject("must not be empty"));
        }
        if trimmed.len() > MAX_PRODUCT_ID_LEN {
            return Err(reject("longer than 128 characters"));
        }
        if !trimmed.chars().all(|c| c.is_ascii_graphic()) {
            return Err(reject("must be printable ASCII without spaces"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Borrow the raw ledger key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ProductId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_resolve_aliases() {
        assert_eq!(Organization::resolve("manufacturer").unwrap(), Organization::Org1);
        assert_eq!(Organization::resolve("Org1MSP").unwrap(), Organization::Org1);
        assert_eq!(Organization::resolve(" org1 ").unwrap(), Organization::Org1);
        assert_eq!(Organization::resolve("consumer").unwrap(), Organization::Org2);
        assert_eq!(Organization::resolve("ORG2").unwrap(), Organization::Org2);
    }

    #[test]
    fn test_resolve_rejects_unknown_and_blank() {
        assert!(matches!(
            Organization::resolve("org3"),
            Err(ValidationError::UnknownOrganization(_))
        ));
        assert_eq!(
            Organization::resolve("  "),
            Err(ValidationError::MissingField("orgName"))
        );
    }

    #[test]
    fn test_org_derived_names() {
        assert_eq!(Organization::Org1.msp_id(), "Org1MSP");
        assert_eq!(Organization::Org2.ca_host(), "ca.org2.example.com");
        assert_eq!(Organization::Org1.default_affiliation(), "org1.department1");
        assert_eq!(Organization::from_msp_id("Org2MSP"), Some(Organization::Org2));
        assert_eq!(Organization::from_msp_id("org2"), None);
    }

    #[test]
    fn test_org_serde_lowercase() {
        let json = serde_json::to_string(&Organization::Org2).unwrap();
        assert_eq!(json, "\"org2\"");
    }

    #[test]
    fn test_user_id_validation() {
        assert!(UserId::new("alice").is_ok());
        assert!(UserId::new("bob.smith@factory-1").is_ok());
        assert!(UserId::new("").is_err());
        assert!(UserId::new("../etc/passwd").is_err());
        assert!(UserId::new("a b").is_err());
        assert!(UserId::new(".hidden").is_err());
        assert!(UserId::new("x".repeat(65)).is_err());
    }

    #[test]
    fn test_user_id_deserialize_validates() {
        assert!(serde_json::from_str::<UserId>("\"alice\"").is_ok());
        assert!(serde_json::from_str::<UserId>("\"a/b\"").is_err());
    }

    #[test]
    fn test_admin_user() {
        assert_eq!(UserId::admin().as_str(), ADMIN_USER);
        assert_eq!(UserId::admin(), UserId::new("admin").unwrap());
    }

    #[test]
    fn test_generated_product_id_is_hex_sha256() {
        let id = ProductId::generate(
            &UserId::new("acme").unwrap(),
            "beer",
            "good",
            Timestamp::now(),
        );
        assert_eq!(id.as_str().len(), 64);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_same_inputs_same_second_give_distinct_ids() {
        let user = UserId::new("acme").unwrap();
        let at = Timestamp::parse("2026-01-15T12:00:00Z").unwrap();
        let a = ProductId::generate(&user, "beer", "good", at);
        let b = ProductId::generate(&user, "beer", "good", at);
        assert_ne!(a, b);
    }

    #[test]
    fn test_product_id_parse() {
        assert_eq!(ProductId::parse("  p-1 ").unwrap().as_str(), "p-1");
        assert!(ProductId::parse("").is_err());
        assert!(ProductId::parse("has space").is_err());
    }

    proptest! {
        #[test]
        fn prop_valid_user_ids_roundtrip(name in "[a-z0-9][a-z0-9._@-]{0,40}") {
            let id = UserId::new(name.clone()).unwrap();
            prop_assert_eq!(id.as_str(), name.as_str());
        }
    }
}
