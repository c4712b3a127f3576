//! # Keystore Subcommands
//!
//! `list-identities` and `revoke`. Both work on the keystore alone and never
//! contact an enrollment authority.

use std::path::Path;

use anyhow::{bail, Context};
use clap::Args;

use prodtrack_core::{Organization, UserId};
use prodtrack_wallet::{IdentityStore, WalletError};

use crate::open_wallet;

/// Arguments for `list-identities`.
#[derive(Args, Debug)]
pub struct ListIdentitiesArgs {
    /// Only list this organization. Defaults to every organization.
    #[arg(long)]
    pub org: Option<String>,
}

/// Arguments for `revoke`.
#[derive(Args, Debug)]
pub struct RevokeArgs {
    /// Organization of the identity.
    #[arg(long)]
    pub org: String,

    /// User id to remove.
    #[arg(long)]
    pub user: String,

    /// Also allow removing an administrator identity.
    #[arg(long)]
    pub force: bool,
}

/// Print `org user role msp serial` for every stored identity.
///
/// Unreadable identity files are reported and make the exit code 1.
pub fn run_list_identities(args: &ListIdentitiesArgs, wallet_dir: &Path) -> anyhow::Result<u8> {
    let orgs = match &args.org {
        Some(name) => vec![Organization::resolve(name)?],
        None => Organization::ALL.to_vec(),
    };
    let store = open_wallet(wallet_dir)?;
    let mut unreadable = 0;
    for org in orgs {
        for line in identity_lines(store.as_ref(), org, &mut unreadable)? {
            println!("{line}");
        }
    }
    Ok(if unreadable == 0 { 0 } else { 1 })
}

fn identity_lines(
    store: &dyn IdentityStore,
    org: Organization,
    unreadable: &mut usize,
) -> anyhow::Result<Vec<String>> {
    let users = store
        .list(org)
        .with_context(|| format!("cannot list identities of {org}"))?;
    let mut lines = Vec::with_capacity(users.len());
    for user in users {
        match store.get(org, &user) {
            Ok(record) => {
                let role = if record.is_admin() { "admin" } else { "client" };
                lines.push(format!(
                    "{org}\t{user}\t{role}\t{}\t{}",
                    record.msp_id(),
                    record.certificate().serial
                ));
            }
            Err(e) => {
                tracing::warn!(%org, %user, error = %e, "unreadable identity");
                eprintln!("{org}/{user}: {e}");
                *unreadable += 1;
            }
        }
    }
    Ok(lines)
}

/// Remove an identity from the keystore.
///
/// Administrator identities are kept unless `--force` is given: without
/// them no further users can be registered for the organization.
pub fn run_revoke(args: &RevokeArgs, wallet_dir: &Path) -> anyhow::Result<u8> {
    let org = Organization::resolve(&args.org)?;
    let user = UserId::new(args.user.as_str())?;
    let store = open_wallet(wallet_dir)?;
    revoke(store.as_ref(), org, &user, args.force)
}

fn revoke(
    store: &dyn IdentityStore,
    org: Organization,
    user: &UserId,
    force: bool,
) -> anyhow::Result<u8> {
    let record = match store.get(org, user) {
        Ok(record) => record,
        Err(WalletError::NotFound { .. }) => {
            eprintln!("{user} is not enrolled in {org}");
            return Ok(2);
        }
        Err(e) => return Err(e).with_context(|| format!("cannot read {user} in {org}")),
    };
    if record.is_admin() && !force {
        bail!("{user} is the {org} administrator; pass --force to remove it");
    }
    store
        .remove(org, user)
        .with_context(|| format!("cannot remove {user} from {org}"))?;
    tracing::info!(%org, %user, serial = %record.certificate().serial, "identity revoked");
    println!("{user} removed from {org}");
    Ok(0)
}
