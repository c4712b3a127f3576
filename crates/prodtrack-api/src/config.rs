//! # Service Configuration
//!
//! Process-level settings. Each subsystem loads its own section
//! ([`CaConfig`](prodtrack_ca_client::CaConfig),
//! [`SessionConfig`](prodtrack_session::SessionConfig),
//! [`GatewayConfig`](prodtrack_ledger::GatewayConfig),
//! [`PoolConfig`](prodtrack_ledger::PoolConfig)); this one covers what only
//! the HTTP service needs.

use std::path::PathBuf;

/// Where ledger transactions execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerBackend {
    /// Per-organization HTTP gateways.
    Http,
    /// The contract runs in this process; state is lost on exit.
    Memory,
}

impl std::str::FromStr for LedgerBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Origin allowed by CORS (the UI).
    pub cors_origin: String,
    /// Filesystem keystore root; `None` keeps identities in memory.
    pub wallet_dir: Option<PathBuf>,
    pub ledger_backend: LedgerBackend,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// - `PORT` (default: 4000)
    /// - `CORS_ORIGIN` (default: `http://localhost:3000`)
    /// - `WALLET_DIR` (default: unset, in-memory wallet)
    /// - `LEDGER_BACKEND` (`http` or `memory`, default: `http`)
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            Err(_) => 4000,
        };
        let ledger_backend = match std::env::var("LEDGER_BACKEND") {
            Ok(raw) => raw.parse()?,
            Err(_) => LedgerBackend::Http,
        };
        Ok(Self {
            port,
            cors_origin: std::env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            wallet_dir: std::env::var_os("WALLET_DIR")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            ledger_backend,
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 4000,
            cors_origin: "http://localhost:3000".to_string(),
            wallet_dir: None,
            ledger_backend: LedgerBackend::Memory,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("PORT must be a number between 0 and 65535, got {0:?}")]
    InvalidPort(String),
    #[error("LEDGER_BACKEND must be \"http\" or \"memory\", got {0:?}")]
    UnknownBackend(String),
}
