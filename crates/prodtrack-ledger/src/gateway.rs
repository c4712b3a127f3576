//! # HTTP Ledger Gateway
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | POST | `/api/v1/channels/{channel}/chaincodes/{chaincode}/submit`   | Submit and wait for commit |
//! | POST | `/api/v1/channels/{channel}/chaincodes/{chaincode}/evaluate` | Evaluate a query |
//!
//! Every request is signed by the caller's identity: the certificate PEM
//! travels base64-encoded in `x-certificate`, and `x-signature` carries the
//! Ed25519 signature over the exact body bytes.
//!
//! Evaluations are re-sent with exponential backoff when the gateway is
//! unreachable or answers 503, per [`GatewayConfig::retry`]; submissions
//! are sent once.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use prodtrack_core::{Organization, UserId};
use prodtrack_crypto::Ed25519KeyPair;
use prodtrack_wallet::{IdentityRecord, IdentityStore};

use crate::config::{GatewayConfig, RetryPolicy};
use crate::contract::{Committed, Connector, LedgerContract};
use crate::error::{ConnectError, ContractError, QueryError, TxnError};
use crate::retry::evaluate_with_backoff;
use crate::types::{
    GatewayErrorBody, InvokeRequest, InvokeResponse, HEADER_CERTIFICATE, HEADER_MSP_ID,
    HEADER_SIGNATURE,
};

/// Connector that talks to per-organization gateways over HTTP.
#[derive(Clone)]
pub struct HttpConnector {
    http: reqwest::Client,
    config: GatewayConfig,
    store: Arc<dyn IdentityStore>,
}

impl std::fmt::Debug for HttpConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpConnector")
            .field("config", &self.config)
            .finish()
    }
}

impl HttpConnector {
    pub fn new(config: GatewayConfig, store: Arc<dyn IdentityStore>) -> Result<Self, ConnectError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(ConnectError::Client)?;
        Ok(Self {
            http,
            config,
            store,
        })
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn connect(
        &self,
        org: Organization,
        user: &UserId,
    ) -> Result<Arc<dyn LedgerContract>, ConnectError> {
        let base_url = self
            .config
            .gateways
            .get(&org)
            .ok_or(ConnectError::UnknownOrganization(org))?;
        let identity = self.store.get(org, user)?;
        let key = identity.key_pair()?;
        let contract_url = format!(
            "{}api/v1/channels/{}/chaincodes/{}",
            base_url, self.config.channel, self.config.chaincode
        );
        tracing::debug!(%org, %user, url = %contract_url, "bound gateway connection");
        Ok(Arc::new(HttpConnection {
            http: self.http.clone(),
            contract_url,
            certificate_b64: STANDARD.encode(identity.certificate_pem()),
            key,
            identity,
            retry: self.config.retry,
        }))
    }
}

/// A gateway connection bound to one identity.
pub struct HttpConnection {
    http: reqwest::Client,
    contract_url: String,
    certificate_b64: String,
    key: Ed25519KeyPair,
    identity: IdentityRecord,
    retry: RetryPolicy,
}

impl std::fmt::Debug for HttpConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpConnection")
            .field("contract_url", &self.contract_url)
            .field("identity", &self.identity)
            .finish()
    }
}

impl HttpConnection {
    fn signed_body(&self, function: &str, args: &[String]) -> Result<(Vec<u8>, String), String> {
        let body = serde_json::to_vec(&InvokeRequest {
            function: function.to_string(),
            args: args.to_vec(),
        })
        .map_err(|e| format!("cannot encode request: {e}"))?;
        let signature = self.key.sign(&body).to_base64();
        Ok((body, signature))
    }

    fn request(&self, url: &str, body: &[u8], signature: &str) -> reqwest::RequestBuilder {
        self.http
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(HEADER_MSP_ID, self.identity.msp_id())
            .header(HEADER_CERTIFICATE, &self.certificate_b64)
            .header(HEADER_SIGNATURE, signature)
            .body(body.to_vec())
    }
}

/// Outcome of reading a gateway response.
enum Reply {
    Ok(InvokeResponse),
    Rejected(ContractError),
    Gateway { status: u16, body: String },
    Malformed(String),
}

async fn read_reply(resp: reqwest::Response) -> Result<Reply, reqwest::Error> {
    let status = resp.status();
    let text = resp.text().await?;
    if status.is_success() {
        return Ok(match serde_json::from_str::<InvokeResponse>(&text) {
            Ok(body) => Reply::Ok(body),
            Err(e) => Reply::Malformed(e.to_string()),
        });
    }
    Ok(match serde_json::from_str::<GatewayErrorBody>(&text) {
        Ok(body) => Reply::Rejected(ContractError::new(body.error.code, body.error.message)),
        Err(_) => Reply::Gateway {
            status: status.as_u16(),
            body: text,
        },
    })
}

fn decode_payload(payload: &str) -> Result<Vec<u8>, String> {
    STANDARD
        .decode(payload)
        .map_err(|e| format!("payload is not base64: {e}"))
}

#[async_trait]
impl LedgerContract for HttpConnection {
    fn org(&self) -> Organization {
        self.identity.org()
    }

    fn user(&self) -> &UserId {
        self.identity.user()
    }

    async fn submit(&self, function: &str, args: &[String]) -> Result<Committed, TxnError> {
        let endpoint = format!("POST /submit {function}");
        let url = format!("{}/submit", self.contract_url);
        let (body, signature) = self
            .signed_body(function, args)
            .map_err(|reason| TxnError::Deserialization {
                endpoint: endpoint.clone(),
                reason,
            })?;

        let resp = self
            .request(&url, &body, &signature)
            .send()
            .await
            .map_err(|source| TxnError::Http {
                endpoint: endpoint.clone(),
                source,
            })?;
        let reply = read_reply(resp).await.map_err(|source| TxnError::Http {
            endpoint: endpoint.clone(),
            source,
        })?;

        match reply {
            Reply::Ok(ok) => {
                let payload = decode_payload(&ok.payload).map_err(|reason| {
                    TxnError::Deserialization {
                        endpoint: endpoint.clone(),
                        reason,
                    }
                })?;
                let transaction_id =
                    ok.transaction_id
                        .ok_or_else(|| TxnError::Deserialization {
                            endpoint: endpoint.clone(),
                            reason: "committed transaction without an id".to_string(),
                        })?;
                Ok(Committed {
                    transaction_id,
                    payload,
                })
            }
            Reply::Rejected(e) => Err(TxnError::Rejected(e)),
            Reply::Gateway { status, body } => Err(TxnError::Gateway {
                endpoint,
                status,
                body,
            }),
            Reply::Malformed(reason) => Err(TxnError::Deserialization { endpoint, reason }),
        }
    }

    async fn evaluate(&self, function: &str, args: &[String]) -> Result<Vec<u8>, QueryError> {
        let endpoint = format!("POST /evaluate {function}");
        let url = format!("{}/evaluate", self.contract_url);
        let (body, signature) = self
            .signed_body(function, args)
            .map_err(|reason| QueryError::Deserialization {
                endpoint: endpoint.clone(),
                reason,
            })?;

        let resp = evaluate_with_backoff(&self.retry, &endpoint, || {
            self.request(&url, &body, &signature).send()
        })
        .await
            .map_err(|source| QueryError::Http {
                endpoint: endpoint.clone(),
                source,
            })?;
        let reply = read_reply(resp).await.map_err(|source| QueryError::Http {
            endpoint: endpoint.clone(),
            source,
        })?;

        match reply {
            Reply::Ok(ok) => decode_payload(&ok.payload)
                .map_err(|reason| QueryError::Deserialization { endpoint, reason }),
            Reply::Rejected(e) => Err(QueryError::Rejected(e)),
            Reply::Gateway { status, body } => Err(QueryError::Gateway {
                endpoint,
                status,
                body,
            }),
            Reply::Malformed(reason) => Err(QueryError::Deserialization { endpoint, reason }),
        }
    }
}
