//! # prodtrack-api — Binary Entry Point
//!
//! Bootstraps the identity store, enrolls each organization's administrator,
//! and serves the HTTP API. Binds to `PORT` (default 4000).

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use prodtrack_api::config::{AppConfig, LedgerBackend};
use prodtrack_api::AppState;
use prodtrack_ca_client::{CaConfig, EnrollmentService};
use prodtrack_core::Organization;
use prodtrack_ledger::{
    ConnectionPool, Connector, GatewayConfig, HttpConnector, MemoryNetwork, PoolConfig,
};
use prodtrack_session::{SessionBridge, SessionConfig};
use prodtrack_wallet::{FileSystemWallet, IdentityStore, InMemoryWallet};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env().context("invalid service configuration")?;

    let store: Arc<dyn IdentityStore> = match &config.wallet_dir {
        Some(dir) => Arc::new(
            FileSystemWallet::open(dir)
                .with_context(|| format!("cannot open wallet at {}", dir.display()))?,
        ),
        None => {
            tracing::warn!("WALLET_DIR not set; identities are kept in memory only");
            Arc::new(InMemoryWallet::new())
        }
    };

    let enrollment = EnrollmentService::new(
        CaConfig::from_env().context("invalid enrollment authority configuration")?,
        store.clone(),
    )?;
    for org in Organization::ALL {
        match enrollment.enroll_administrator(org).await {
            Ok(admin) => tracing::info!(%org, msp_id = admin.msp_id(), "admin identity ready"),
            Err(e) => tracing::warn!(
                %org,
                error = %e,
                "admin enrollment failed; registration for this organization will be unavailable"
            ),
        }
    }

    let sessions = SessionBridge::new(
        &SessionConfig::from_env().context("invalid session configuration")?,
        store.clone(),
    );

    let pool_config = PoolConfig::from_env().context("invalid pool configuration")?;
    let ledger: Arc<dyn Connector> = match config.ledger_backend {
        LedgerBackend::Memory => {
            tracing::info!("using in-process ledger; state is lost on exit");
            spawn_evictor(ConnectionPool::new(MemoryNetwork::new(store.clone()), pool_config))
        }
        LedgerBackend::Http => {
            let gateway = GatewayConfig::from_env().context("invalid gateway configuration")?;
            spawn_evictor(ConnectionPool::new(
                HttpConnector::new(gateway, store.clone())?,
                pool_config,
            ))
        }
    };

    let port = config.port;
    let state = AppState::new(config, enrollment, sessions, ledger);
    let app = prodtrack_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "prodtrack API listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Periodically drop idle pooled connections.
fn spawn_evictor<C: Connector + 'static>(pool: ConnectionPool<C>) -> Arc<dyn Connector> {
    let pool = Arc::new(pool);
    let period = pool_sweep_period(pool.config().idle_timeout);
    let sweeper = Arc::clone(&pool);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            sweeper.evict_idle();
        }
    });
    pool
}

fn pool_sweep_period(idle_timeout: Duration) -> Duration {
    (idle_timeout / 2).max(Duration::from_secs(1))
}
