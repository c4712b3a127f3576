//! # Session Bridge
//!
//! Identity proof is possession-based: the caller presents the private key
//! PEM handed out at registration and it is compared, in constant time,
//! with the stored key for `(org, user)`.
//!
//! A challenge-response proof (sign a server nonce) would keep the key off
//! the wire entirely; the current login contract sends the key itself.

use std::sync::Arc;

use subtle::ConstantTimeEq;

use prodtrack_core::{Organization, Timestamp, UserId};
use prodtrack_crypto::Ed25519KeyPair;
use prodtrack_wallet::{IdentityStore, WalletError};

use crate::config::SessionConfig;
use crate::error::{AuthFailure, TokenError};
use crate::token::{SessionClaims, SessionToken};

/// Issues and verifies session tokens for enrolled identities.
#[derive(Clone)]
pub struct SessionBridge {
    store: Arc<dyn IdentityStore>,
    key: Arc<Ed25519KeyPair>,
    ttl_secs: i64,
}

impl std::fmt::Debug for SessionBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBridge")
            .field("key", &"[REDACTED]")
            .field("ttl_secs", &self.ttl_secs)
            .finish()
    }
}

impl SessionBridge {
    /// Build a bridge over `store`.
    ///
    /// Without a configured secret an ephemeral signing key is generated;
    /// tokens then stop verifying when the process restarts.
    pub fn new(config: &SessionConfig, store: Arc<dyn IdentityStore>) -> Self {
        let key = match &config.secret {
            Some(secret) => Ed25519KeyPair::from_secret(secret.as_bytes()),
            None => {
                tracing::warn!("SESSION_SECRET not set; using an ephemeral session signing key");
                Ed25519KeyPair::generate()
            }
        };
        Self {
            store,
            key: Arc::new(key),
            ttl_secs: i64::try_from(config.ttl_secs).unwrap_or(i64::MAX),
        }
    }

    /// Token lifetime in seconds.
    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Prove possession of the stored identity and issue a token.
    pub fn authenticate(
        &self,
        user: &UserId,
        org: Organization,
        submitted_key: &str,
    ) -> Result<SessionToken, AuthFailure> {
        let record = match self.store.get(org, user) {
            Ok(record) => record,
            Err(WalletError::NotFound { .. }) => {
                tracing::info!(%org, %user, "login for unregistered user");
                return Err(AuthFailure::NotRegistered {
                    org,
                    user: user.clone(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        if !keys_match(submitted_key.as_bytes(), record.private_key_pem().as_bytes()) {
            tracing::info!(%org, %user, "login with mismatched key");
            return Err(AuthFailure::KeyMismatch);
        }

        let token = self.issue_token(user, org)?;
        tracing::info!(%org, %user, "issued session token");
        Ok(token)
    }

    /// Issue a token for `user` in `org`, starting now.
    pub fn issue_token(&self, user: &UserId, org: Organization) -> Result<SessionToken, TokenError> {
        self.issue_token_at(user, org, Timestamp::now())
    }

    /// Issue a token whose lifetime starts at `issued_at`.
    pub fn issue_token_at(
        &self,
        user: &UserId,
        org: Organization,
        issued_at: Timestamp,
    ) -> Result<SessionToken, TokenError> {
        let iat = issued_at.epoch_secs();
        let claims = SessionClaims {
            sub: user.clone(),
            org,
            iat,
            exp: iat.saturating_add(self.ttl_secs),
        };
        SessionToken::sign(claims, &self.key)
    }

    /// Verify a token against the current time.
    pub fn verify_token(&self, token: &str) -> Result<SessionClaims, TokenError> {
        self.verify_token_at(token, Timestamp::now())
    }

    /// Verify a token as of `now`. Valid strictly before `exp`.
    pub fn verify_token_at(&self, token: &str, now: Timestamp) -> Result<SessionClaims, TokenError> {
        let decoded = SessionToken::decode(token, &self.key.public_key())?;
        let claims = decoded.claims().clone();
        if !claims.is_live_at(now) {
            return Err(TokenError::Expired {
                expired_at: claims.exp,
            });
        }
        Ok(claims)
    }
}

/// Constant-time equality over the submitted and stored key bytes.
///
/// A length mismatch still runs a full-length comparison so the timing does
/// not reveal how long the stored key is.
fn keys_match(submitted: &[u8], stored: &[u8]) -> bool {
    if submitted.len() != stored.len() {
        let _ = stored.ct_eq(stored);
        return false;
    }
    submitted.ct_eq(stored).into()
}
