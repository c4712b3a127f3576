//! Ledger gateway and connection pool configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use url::Url;

use prodtrack_core::Organization;

/// Where each organization's gateway lives and which contract to bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Gateway base URL per organization.
    pub gateways: BTreeMap<Organization, Url>,
    /// Channel name.
    pub channel: String,
    /// Contract (chaincode) name.
    pub chaincode: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Backoff applied to evaluations.
    pub retry: RetryPolicy,
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    ///
    /// - `ORG1_GATEWAY_URL` (default: `http://localhost:7051`)
    /// - `ORG2_GATEWAY_URL` (default: `http://localhost:9051`)
    /// - `CHANNEL_NAME` (default: `mychannel`), `CHAINCODE_NAME` (default: `basic`)
    /// - `GATEWAY_TIMEOUT_SECS` (default: 30)
    /// - `GATEWAY_QUERY_RETRIES` (default: 3), `GATEWAY_RETRY_BASE_MS` (default: 200)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut gateways = BTreeMap::new();
        gateways.insert(
            Organization::Org1,
            env_url("ORG1_GATEWAY_URL", "http://localhost:7051")?,
        );
        gateways.insert(
            Organization::Org2,
            env_url("ORG2_GATEWAY_URL", "http://localhost:9051")?,
        );
        Ok(Self {
            gateways,
            channel: env_or("CHANNEL_NAME", "mychannel"),
            chaincode: env_or("CHAINCODE_NAME", "basic"),
            timeout_secs: env_number("GATEWAY_TIMEOUT_SECS", 30)?,
            retry: RetryPolicy::from_env()?,
        })
    }

    /// Both organizations served by one gateway at `base`.
    pub fn local_mock(base: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(base)
            .map_err(|e| ConfigError::InvalidUrl(base.to_string(), e.to_string()))?;
        Ok(Self {
            gateways: Organization::ALL
                .into_iter()
                .map(|org| (org, url.clone()))
                .collect(),
            channel: "mychannel".to_string(),
            chaincode: "basic".to_string(),
            timeout_secs: 5,
            retry: RetryPolicy::default(),
        })
    }
}

/// Exponential backoff for gateway queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Re-sends after the first attempt. Zero disables retrying.
    pub max_retries: u32,
    /// Delay before the first re-send; doubles for each one after.
    pub base_delay: Duration,
}

impl RetryPolicy {
    fn from_env() -> Result<Self, ConfigError> {
        let max_retries = env_number("GATEWAY_QUERY_RETRIES", 3)?;
        let max_retries = u32::try_from(max_retries).map_err(|_| {
            ConfigError::InvalidNumber("GATEWAY_QUERY_RETRIES".to_string(), max_retries.to_string())
        })?;
        Ok(Self {
            max_retries,
            base_delay: Duration::from_millis(env_number("GATEWAY_RETRY_BASE_MS", 200)?),
        })
    }

    /// Delay before re-send number `attempt + 1`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
        }
    }
}

/// Bounds for the identity-scoped connection pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Maximum pooled connections; the least recently used is evicted
    /// beyond this.
    pub max_connections: usize,
    /// Connections unused for longer than this are dropped.
    pub idle_timeout: Duration,
}

impl PoolConfig {
    /// Load configuration from environment variables.
    ///
    /// - `POOL_MAX_CONNECTIONS` (default: 64)
    /// - `POOL_IDLE_SECS` (default: 300)
    pub fn from_env() -> Result<Self, ConfigError> {
        let max_connections = env_number("POOL_MAX_CONNECTIONS", 64)?;
        if max_connections == 0 {
            return Err(ConfigError::InvalidNumber(
                "POOL_MAX_CONNECTIONS".to_string(),
                "0".to_string(),
            ));
        }
        Ok(Self {
            max_connections: max_connections as usize,
            idle_timeout: Duration::from_secs(env_number("POOL_IDLE_SECS", 300)?),
        })
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 64,
            idle_timeout: Duration::from_secs(300),
        }
    }
}

fn env_or(var: &str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| default.to_string())
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = env_or(var, default);
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

fn env_number(var: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber(var.to_string(), raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("{0} must be a non-negative integer, got {1:?}")]
    InvalidNumber(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_mock_routes_both_orgs_to_one_url() {
        let cfg = GatewayConfig::local_mock("http://127.0.0.1:7051").unwrap();
        assert_eq!(cfg.gateways.len(), 2);
        assert_eq!(cfg.channel, "mychannel");
        assert_eq!(cfg.gateways[&Organization::Org2].as_str(), "http://127.0.0.1:7051/");
    }

    #[test]
    fn env_number_uses_default_when_absent() {
        assert_eq!(env_number("PRODTRACK_NONEXISTENT_NUMBER", 7).unwrap(), 7);
    }

    #[test]
    fn retry_delay_doubles_and_saturates() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_millis(200));
        assert_eq!(policy.delay(1), Duration::from_millis(400));
        assert_eq!(policy.delay(2), Duration::from_millis(800));
        assert_eq!(policy.delay(64), Duration::from_millis(200).saturating_mul(u32::MAX));
    }

    #[test]
    fn pool_defaults() {
        let cfg = PoolConfig::default();
        assert_eq!(cfg.max_connections, 64);
        assert_eq!(cfg.idle_timeout, Duration::from_secs(300));
    }
}
