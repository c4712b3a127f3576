//! # Session Tokens
//!
//! Wire form: `base64url(claims JSON) "." base64url(Ed25519 signature)`,
//! unpadded. The signature covers the exact claims bytes that were
//! encoded, so verification never re-serializes.
//!
//! Claims carry epoch seconds. A token is valid while `now < exp`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use prodtrack_core::{Organization, Timestamp, UserId};
use prodtrack_crypto::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};

use crate::error::TokenError;

/// The signed statement inside a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Authenticated user.
    pub sub: UserId,
    /// The user's organization.
    pub org: Organization,
    /// Issued-at, epoch seconds.
    pub iat: i64,
    /// Expiry, epoch seconds (exclusive).
    pub exp: i64,
}

impl SessionClaims {
    /// Whether the token is still inside its lifetime at `now`.
    pub fn is_live_at(&self, now: Timestamp) -> bool {
        now.epoch_secs() < self.exp
    }
}

/// An issued token: the claims plus their encoded, signed form.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken {
    claims: SessionClaims,
    encoded: String,
}

impl SessionToken {
    /// Sign `claims` with `key`.
    pub(crate) fn sign(claims: SessionClaims, key: &Ed25519KeyPair) -> Result<Self, TokenError> {
        let body = serde_json::to_vec(&claims)
            .map_err(|e| TokenError::Invalid(format!("cannot encode claims: {e}")))?;
        let signature = key.sign(&body);
        let encoded = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&body),
            URL_SAFE_NO_PAD.encode(signature.as_bytes())
        );
        Ok(Self { claims, encoded })
    }

    /// Parse and check the signature, without looking at expiry.
    pub(crate) fn decode(token: &str, key: &Ed25519PublicKey) -> Result<Self, TokenError> {
        let (body_b64, sig_b64) = token
            .trim()
            .split_once('.')
            .ok_or_else(|| TokenError::Invalid("missing signature segment".into()))?;
        let body = URL_SAFE_NO_PAD
            .decode(body_b64)
            .map_err(|_| TokenError::Invalid("claims are not base64url".into()))?;
        let sig_bytes = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|_| TokenError::Invalid("signature is not base64url".into()))?;
        let signature = Ed25519Signature::from_slice(&sig_bytes)
            .map_err(|e| TokenError::Invalid(e.to_string()))?;
        key.verify(&body, &signature)
            .map_err(|_| TokenError::Invalid("signature mismatch".into()))?;
        let claims: SessionClaims = serde_json::from_slice(&body)
            .map_err(|e| TokenError::Invalid(format!("malformed claims: {e}")))?;
        Ok(Self {
            claims,
            encoded: token.trim().to_string(),
        })
    }

    /// The verified claims.
    pub fn claims(&self) -> &SessionClaims {
        &self.claims
    }

    /// Encoded form, suitable for an `Authorization: Bearer` header.
    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    /// Consume into the encoded form.
    pub fn into_string(self) -> String {
        self.encoded
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionToken")
            .field("claims", &self.claims)
            .field("encoded", &"[REDACTED]")
            .finish()
    }
}
