//! # Enrollment Authority HTTP Client
//!
//! | Method | Path                | Auth                               | Operation |
//! |--------|---------------------|------------------------------------|-----------|
//! | POST   | `/api/v1/register`  | registrar token (cert + signature) | Register a user, returns a one-time secret |
//! | POST   | `/api/v1/enroll`    | HTTP basic `id:secret`             | Certify a public key, returns a certificate |
//!
//! The registrar token is `base64(certificate PEM) "." base64(signature)`,
//! the signature covering the exact request body bytes.
//!
//! Neither call is retried: a register that reached the authority but lost
//! its response would fail on replay with "already registered", and the
//! caller is better placed to decide what that means.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use url::Url;
use zeroize::Zeroizing;

use prodtrack_crypto::Ed25519PublicKey;
use prodtrack_wallet::IdentityRecord;

use crate::error::EnrollmentError;
use crate::types::{CaResponse, EnrollRequest, EnrollResult, RegisterRequest, RegisterResult};

const API_PREFIX: &str = "api/v1";

/// Client for one organization's enrollment authority.
#[derive(Debug, Clone)]
pub struct AuthorityClient {
    http: reqwest::Client,
    base_url: Url,
    ca_name: String,
}

impl AuthorityClient {
    pub(crate) fn new(http: reqwest::Client, base_url: Url, ca_name: String) -> Self {
        Self {
            http,
            base_url,
            ca_name,
        }
    }

    /// CA name sent with every request.
    pub fn ca_name(&self) -> &str {
        &self.ca_name
    }

    /// Register `user_id` on behalf of `registrar`.
    ///
    /// Calls `POST {base_url}/api/v1/register`. Returns the one-time
    /// enrollment secret.
    pub async fn register(
        &self,
        registrar: &IdentityRecord,
        user_id: &str,
        affiliation: &str,
    ) -> Result<Zeroizing<String>, EnrollmentError> {
        let endpoint = "POST /register";
        let url = format!("{}{API_PREFIX}/register", self.base_url);
        let body = serde_json::to_vec(&RegisterRequest {
            id: user_id.to_string(),
            kind: "client".to_string(),
            affiliation: affiliation.to_string(),
            caname: self.ca_name.clone(),
        })
        .map_err(|e| EnrollmentError::Deserialization {
            endpoint: endpoint.into(),
            reason: format!("cannot encode request: {e}"),
        })?;
        let signature = registrar.key_pair()?.sign(&body);
        let token = format!(
            "{}.{}",
            STANDARD.encode(registrar.certificate_pem()),
            signature.to_base64()
        );

        let resp = self
            .http
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| EnrollmentError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;

        let result: RegisterResult = read_envelope(endpoint, resp).await?;
        Ok(Zeroizing::new(result.secret))
    }

    /// Enroll `enrollment_id` with its secret, certifying `public_key`.
    ///
    /// Calls `POST {base_url}/api/v1/enroll`. Returns the certificate PEM.
    pub async fn enroll(
        &self,
        enrollment_id: &str,
        secret: &str,
        public_key: &Ed25519PublicKey,
    ) -> Result<String, EnrollmentError> {
        let endpoint = "POST /enroll";
        let url = format!("{}{API_PREFIX}/enroll", self.base_url);
        let req = EnrollRequest {
            caname: self.ca_name.clone(),
            public_key: public_key.to_hex(),
        };

        let resp = self
            .http
            .post(&url)
            .basic_auth(enrollment_id, Some(secret))
            .json(&req)
            .send()
            .await
            .map_err(|e| EnrollmentError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;

        let result: EnrollResult = read_envelope(endpoint, resp).await?;
        let pem_bytes = STANDARD.decode(result.cert.trim()).map_err(|e| {
            EnrollmentError::Deserialization {
                endpoint: endpoint.into(),
                reason: format!("certificate is not base64: {e}"),
            }
        })?;
        String::from_utf8(pem_bytes).map_err(|e| EnrollmentError::Deserialization {
            endpoint: endpoint.into(),
            reason: format!("certificate is not UTF-8: {e}"),
        })
    }
}

/// Decode the authority envelope, mapping failures to typed errors.
async fn read_envelope<T: DeserializeOwned>(
    endpoint: &str,
    resp: reqwest::Response,
) -> Result<T, EnrollmentError> {
    let status = resp.status();
    let text = resp.text().await.map_err(|e| EnrollmentError::Http {
        endpoint: endpoint.into(),
        source: e,
    })?;

    let envelope: CaResponse<T> = match serde_json::from_str(&text) {
        Ok(envelope) => envelope,
        Err(_) if !status.is_success() => {
            return Err(EnrollmentError::Authority {
                endpoint: endpoint.into(),
                status: status.as_u16(),
                message: text,
            })
        }
        Err(e) => {
            return Err(EnrollmentError::Deserialization {
                endpoint: endpoint.into(),
                reason: e.to_string(),
            })
        }
    };

    if !status.is_success() || !envelope.success {
        return Err(EnrollmentError::Authority {
            endpoint: endpoint.into(),
            status: status.as_u16(),
            message: envelope.error_message(),
        });
    }

    envelope
        .result
        .ok_or_else(|| EnrollmentError::Deserialization {
            endpoint: endpoint.into(),
            reason: "successful response without a result".to_string(),
        })
}
