//! # Identity Subcommands
//!
//! `enroll-admin` and `register`, both against the enrollment authorities
//! configured through the usual `ORG*_CA_URL` / `CA_ADMIN_*` variables.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Args;

use prodtrack_ca_client::{CaConfig, EnrollmentService};
use prodtrack_core::{Organization, UserId};

use crate::open_wallet;

/// Arguments for `enroll-admin`.
#[derive(Args, Debug)]
pub struct EnrollAdminArgs {
    /// Organization to enroll (`manufacturer`, `consumer`, `org1`, ...).
    /// Defaults to every organization.
    #[arg(long)]
    pub org: Option<String>,
}

/// Arguments for `register`.
#[derive(Args, Debug)]
pub struct RegisterArgs {
    /// Organization of the new user.
    #[arg(long)]
    pub org: String,

    /// New user id.
    #[arg(long)]
    pub user: String,

    /// Affiliation; defaults to `<org>.department1`.
    #[arg(long)]
    pub affiliation: Option<String>,

    /// Write the private key PEM here instead of standard output.
    #[arg(long)]
    pub key_out: Option<PathBuf>,
}

/// Enroll the administrator of one or all organizations.
pub async fn run_enroll_admin(args: &EnrollAdminArgs, wallet_dir: &Path) -> anyhow::Result<u8> {
    let orgs = match &args.org {
        Some(name) => vec![Organization::resolve(name)?],
        None => Organization::ALL.to_vec(),
    };
    let service = service(wallet_dir)?;

    let mut failed = 0;
    for org in orgs {
        match service.enroll_administrator(org).await {
            Ok(admin) => println!("{org}: admin enrolled ({})", admin.msp_id()),
            Err(e) => {
                tracing::error!(%org, error = %e, "admin enrollment failed");
                failed += 1;
            }
        }
    }
    Ok(if failed == 0 { 0 } else { 1 })
}

/// Register a user and hand back its key.
pub async fn run_register(args: &RegisterArgs, wallet_dir: &Path) -> anyhow::Result<u8> {
    let org = Organization::resolve(&args.org)?;
    let user = UserId::new(args.user.as_str())?;
    let service = service(wallet_dir)?;

    let enrollment = service
        .register_and_enroll(org, &user, args.affiliation.as_deref())
        .await
        .with_context(|| format!("cannot register {user} in {org}"))?;

    match &args.key_out {
        Some(path) => {
            if path.exists() {
                bail!("{} already exists; refusing to overwrite a key", path.display());
            }
            std::fs::write(path, enrollment.private_key_pem())
                .with_context(|| format!("cannot write {}", path.display()))?;
            println!("{user} registered in {org}; private key written to {}", path.display());
        }
        None => {
            println!("{user} registered in {org}");
            print!("{}", enrollment.private_key_pem());
        }
    }
    Ok(0)
}

fn service(wallet_dir: &Path) -> anyhow::Result<EnrollmentService> {
    let config = CaConfig::from_env().context("invalid enrollment authority configuration")?;
    Ok(EnrollmentService::new(config, open_wallet(wallet_dir)?)?)
}
