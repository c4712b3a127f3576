//! # prodtrack-cli — Operator Command-Line Interface
//!
//! ## Subcommands
//!
//! - `enroll-admin` — enroll organization administrators into the keystore
//! - `register` — register and enroll an end user, writing its private key
//! - `issue-token` — mint a session token for a stored identity
//! - `verify-token` — check a session token and print its claims
//! - `list-identities` — list the identities held in the keystore
//! - `revoke` — remove an identity from the keystore
//!
//! Every subcommand works on a filesystem keystore (`--wallet-dir` or
//! `WALLET_DIR`), the same one the API server uses.
//!
//! Handlers return the process exit code; argument parsing lives in
//! `main.rs`.

pub mod identity;
pub mod session;
pub mod wallet;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use prodtrack_wallet::{FileSystemWallet, IdentityStore};

/// Open the keystore shared with the API server.
pub fn open_wallet(dir: &Path) -> anyhow::Result<Arc<dyn IdentityStore>> {
    let wallet = FileSystemWallet::open(dir)
        .with_context(|| format!("cannot open wallet at {}", dir.display()))?;
    Ok(Arc::new(wallet))
}
