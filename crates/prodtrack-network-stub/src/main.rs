//! Network stub — standalone development server.
//!
//! Storage is in memory; every identity and product is lost on restart.
//!
//! - `NETWORK_STUB_PORT` (default: 7054)
//! - `STUB_CA_SEED`: derive the issuing key from this secret so certificates
//!   survive a restart (default: fresh key per run)
//! - `CA_ADMIN_ID` / `CA_ADMIN_SECRET` (default: `admin` / `adminpw`)

use std::net::SocketAddr;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use prodtrack_core::UserId;
use prodtrack_crypto::Ed25519KeyPair;
use prodtrack_network_stub::{router, StubState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let port: u16 = std::env::var("NETWORK_STUB_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(7054);

    let ca_key = match std::env::var("STUB_CA_SEED") {
        Ok(seed) if !seed.is_empty() => Ed25519KeyPair::from_secret(seed.as_bytes()),
        _ => {
            tracing::warn!("STUB_CA_SEED not set; certificates from earlier runs will be rejected");
            Ed25519KeyPair::generate()
        }
    };
    let admin_id =
        std::env::var("CA_ADMIN_ID").unwrap_or_else(|_| UserId::admin().as_str().to_string());
    let admin_secret = std::env::var("CA_ADMIN_SECRET").unwrap_or_else(|_| "adminpw".to_string());

    let app = router(StubState::new(ca_key, &admin_id, &admin_secret));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "prodtrack-network-stub listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;
    axum::serve(listener, app).await?;
    Ok(())
}
