//! # Session Subcommands
//!
//! `issue-token` and `verify-token`. Both derive the signing key from
//! `SESSION_SECRET`, so tokens are interchangeable with those of an API
//! server configured with the same secret.

use std::path::Path;

use anyhow::bail;
use clap::Args;

use prodtrack_core::{Organization, UserId};
use prodtrack_session::{SessionBridge, SessionConfig};

use crate::open_wallet;

/// Arguments for `issue-token`.
#[derive(Args, Debug)]
pub struct IssueTokenArgs {
    #[arg(long)]
    pub org: String,

    #[arg(long)]
    pub user: String,

    /// Token lifetime in seconds.
    #[arg(long, default_value_t = prodtrack_session::config::DEFAULT_TTL_SECS)]
    pub ttl_secs: u64,

    #[arg(long, env = "SESSION_SECRET", hide_env_values = true)]
    pub secret: String,
}

/// Arguments for `verify-token`.
#[derive(Args, Debug)]
pub struct VerifyTokenArgs {
    /// The token to check.
    pub token: String,

    #[arg(long, env = "SESSION_SECRET", hide_env_values = true)]
    pub secret: String,
}

/// Mint a token for an identity present in the keystore.
pub fn run_issue_token(args: &IssueTokenArgs, wallet_dir: &Path) -> anyhow::Result<u8> {
    let org = Organization::resolve(&args.org)?;
    let user = UserId::new(args.user.as_str())?;
    let store = open_wallet(wallet_dir)?;
    if !store.exists(org, &user)? {
        bail!("no identity for {user} in {org}; register it first");
    }
    let bridge = SessionBridge::new(&SessionConfig::with_secret(&args.secret, args.ttl_secs), store);
    let token = bridge.issue_token(&user, org)?;
    tracing::info!(%org, %user, exp = token.claims().exp, "session token issued");
    println!("{}", token.as_str());
    Ok(0)
}

/// Exit code 0 for a live token, 2 for an expired or invalid one.
pub fn run_verify_token(args: &VerifyTokenArgs, wallet_dir: &Path) -> anyhow::Result<u8> {
    let bridge = SessionBridge::new(
        &SessionConfig::with_secret(&args.secret, prodtrack_session::config::DEFAULT_TTL_SECS),
        open_wallet(wallet_dir)?,
    );
    match bridge.verify_token(args.token.trim()) {
        Ok(claims) => {
            println!("{}", serde_json::to_string_pretty(&claims)?);
            Ok(0)
        }
        Err(e) => {
            eprintln!("{e}");
            Ok(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prodtrack_core::Timestamp;
    use prodtrack_crypto::{Certificate, CertificateRole, Ed25519KeyPair};
    use prodtrack_wallet::{FileSystemWallet, IdentityRecord, IdentityStore};
    use zeroize::Zeroizing;

    fn seed_identity(dir: &Path, org: Organization, user: &str) {
        let ca = Ed25519KeyPair::generate();
        let key = Ed25519KeyPair::generate();
        let cert = Certificate::issue(
            &ca,
            org.ca_host(),
            user,
            org.msp_id(),
            CertificateRole::Client,
            org.default_affiliation(),
            key.public_key(),
            Timestamp::now(),
        )
        .unwrap();
        let record = IdentityRecord::new(
            org,
            UserId::new(user).unwrap(),
            cert.to_pem().unwrap(),
            key.to_private_pem(),
            Some(Zeroizing::new("s3cret".to_string())),
        )
        .unwrap();
        FileSystemWallet::open(dir).unwrap().put_new(record).unwrap();
    }

    fn issue_args(user: &str) -> IssueTokenArgs {
        IssueTokenArgs {
            org: "consumer".into(),
            user: user.into(),
            ttl_secs: 60,
            secret: "cli-secret".into(),
        }
    }

    #[test]
    fn test_issue_requires_stored_identity() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run_issue_token(&issue_args("bob"), dir.path()).is_err());

        seed_identity(dir.path(), Organization::Org2, "bob");
        assert_eq!(run_issue_token(&issue_args("bob"), dir.path()).unwrap(), 0);
    }

    #[test]
    fn test_verify_exit_codes() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_wallet(dir.path()).unwrap();
        let bridge = SessionBridge::new(&SessionConfig::with_secret("cli-secret", 60), store);
        let token = bridge
            .issue_token(&UserId::new("bob").unwrap(), Organization::Org2)
            .unwrap();

        let ok = VerifyTokenArgs {
            token: token.as_str().to_string(),
            secret: "cli-secret".into(),
        };
        assert_eq!(run_verify_token(&ok, dir.path()).unwrap(), 0);

        let wrong_secret = VerifyTokenArgs {
            token: token.as_str().to_string(),
            secret: "other".into(),
        };
        assert_eq!(run_verify_token(&wrong_secret, dir.path()).unwrap(), 2);

        let expired = bridge
            .issue_token_at(
                &UserId::new("bob").unwrap(),
                Organization::Org2,
                Timestamp::from_epoch_secs(1_000).unwrap(),
            )
            .unwrap();
        let stale = VerifyTokenArgs {
            token: expired.as_str().to_string(),
            secret: "cli-secret".into(),
        };
        assert_eq!(run_verify_token(&stale, dir.path()).unwrap(), 2);
    }
}
