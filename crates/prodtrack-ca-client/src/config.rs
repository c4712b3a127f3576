//! Enrollment authority configuration.
//!
//! One authority per organization, plus the pre-shared bootstrap
//! credentials of each organization's administrator.

use std::collections::BTreeMap;

use url::Url;
use zeroize::Zeroizing;

use prodtrack_core::{Organization, UserId};

/// Where to reach one organization's authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorityEndpoint {
    /// Base URL, e.g. `http://localhost:7054`.
    pub url: Url,
    /// CA name sent as `caname`, e.g. `ca-org1`.
    pub ca_name: String,
}

/// Configuration for the enrollment workflow.
///
/// Custom `Debug` redacts the bootstrap secret.
#[derive(Clone)]
pub struct CaConfig {
    /// Authority per organization.
    pub authorities: BTreeMap<Organization, AuthorityEndpoint>,
    /// Bootstrap administrator id.
    pub admin_id: String,
    /// Bootstrap administrator secret.
    pub admin_secret: Zeroizing<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for CaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaConfig")
            .field("authorities", &self.authorities)
            .field("admin_id", &self.admin_id)
            .field("admin_secret", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl CaConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `ORG1_CA_URL` (default: `http://localhost:7054`), `ORG1_CA_NAME` (default: `ca-org1`)
    /// - `ORG2_CA_URL` (default: `http://localhost:8054`), `ORG2_CA_NAME` (default: `ca-org2`)
    /// - `CA_ADMIN_ID` (default: `admin`), `CA_ADMIN_SECRET` (default: `adminpw`)
    /// - `GATEWAY_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut authorities = BTreeMap::new();
        authorities.insert(
            Organization::Org1,
            AuthorityEndpoint {
                url: env_url("ORG1_CA_URL", "http://localhost:7054")?,
                ca_name: env_or("ORG1_CA_NAME", "ca-org1"),
            },
        );
        authorities.insert(
            Organization::Org2,
            AuthorityEndpoint {
                url: env_url("ORG2_CA_URL", "http://localhost:8054")?,
                ca_name: env_or("ORG2_CA_NAME", "ca-org2"),
            },
        );
        let admin_secret = env_or("CA_ADMIN_SECRET", "adminpw");
        if admin_secret.is_empty() {
            return Err(ConfigError::EmptyAdminSecret);
        }
        Ok(Self {
            authorities,
            admin_id: env_or("CA_ADMIN_ID", UserId::admin().as_str()),
            admin_secret: Zeroizing::new(admin_secret),
            timeout_secs: std::env::var("GATEWAY_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        })
    }

    /// Both organizations served by one authority at `base` (for tests and
    /// the local network stub, which route by `caname`).
    pub fn local_mock(base: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(base)
            .map_err(|e| ConfigError::InvalidUrl(base.to_string(), e.to_string()))?;
        let authorities = Organization::ALL
            .into_iter()
            .map(|org| {
                (
                    org,
                    AuthorityEndpoint {
                        url: url.clone(),
                        ca_name: format!("ca-{}", org.as_str()),
                    },
                )
            })
            .collect();
        Ok(Self {
            authorities,
            admin_id: "admin".to_string(),
            admin_secret: Zeroizing::new("adminpw".to_string()),
            timeout_secs: 5,
        })
    }
}

fn env_or(var: &str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| default.to_string())
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = env_or(var, default);
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("CA_ADMIN_SECRET must not be empty")]
    EmptyAdminSecret,
    #[error("CA_ADMIN_ID is not a valid user id: {0}")]
    InvalidAdminId(String),
}
