//! Session bridge configuration.

use zeroize::Zeroizing;

/// Default token lifetime: 24 hours.
pub const DEFAULT_TTL_SECS: u64 = 86_400;

/// Signing secret and token lifetime.
///
/// Custom `Debug` redacts the secret.
#[derive(Clone)]
pub struct SessionConfig {
    /// Secret the signing key is derived from. `None` means an ephemeral key
    /// is generated at startup and tokens die with the process.
    pub secret: Option<Zeroizing<String>>,
    /// Token lifetime in seconds.
    pub ttl_secs: u64,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .field("ttl_secs", &self.ttl_secs)
            .finish()
    }
}

impl SessionConfig {
    /// Load configuration from environment variables.
    ///
    /// - `SESSION_SECRET` (optional; empty counts as unset)
    /// - `SESSION_TTL_SECS` (default: 86400, must be positive)
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret = std::env::var("SESSION_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .map(Zeroizing::new);
        let ttl_secs = match std::env::var("SESSION_TTL_SECS") {
            Ok(raw) => parse_ttl(&raw)?,
            Err(_) => DEFAULT_TTL_SECS,
        };
        Ok(Self { secret, ttl_secs })
    }

    /// Fixed secret and lifetime, for tests and tooling.
    pub fn with_secret(secret: &str, ttl_secs: u64) -> Self {
        Self {
            secret: Some(Zeroizing::new(secret.to_string())),
            ttl_secs,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: None,
            ttl_secs: DEFAULT_TTL_SECS,
        }
    }
}

fn parse_ttl(raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(ConfigError::InvalidTtl(raw.to_string())),
        Ok(secs) if secs > i64::MAX as u64 => Err(ConfigError::InvalidTtl(raw.to_string())),
        Ok(secs) => Ok(secs),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("SESSION_TTL_SECS must be a positive integer, got {0:?}")]
    InvalidTtl(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ttl_accepts_positive() {
        assert_eq!(parse_ttl("3600").unwrap(), 3600);
        assert_eq!(parse_ttl(" 60 ").unwrap(), 60);
    }

    #[test]
    fn parse_ttl_rejects_zero_and_garbage() {
        assert!(parse_ttl("0").is_err());
        assert!(parse_ttl("-5").is_err());
        assert!(parse_ttl("soon").is_err());
    }

    #[test]
    fn debug_redacts_secret() {
        let cfg = SessionConfig::with_secret("hunter2", 60);
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_is_ephemeral_24h() {
        let cfg = SessionConfig::default();
        assert!(cfg.secret.is_none());
        assert_eq!(cfg.ttl_secs, 86_400);
    }
}
