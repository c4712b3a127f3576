//! Route definitions for the network stub.
//!
//! | Method | Path | Auth |
//! |--------|------|------|
//! | POST | `/api/v1/register` | registrar token: `base64(cert PEM).base64(signature over body)` |
//! | POST | `/api/v1/enroll` | HTTP basic `id:secret` |
//! | POST | `/api/v1/channels/{channel}/chaincodes/{chaincode}/submit` | `x-certificate` + `x-signature` |
//! | POST | `/api/v1/channels/{channel}/chaincodes/{chaincode}/evaluate` | `x-certificate` + `x-signature` |
//!
//! Responses deserialize into the client crates' wire types.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::headers::authorization::Basic;
use axum_extra::headers::{Authorization, HeaderMapExt};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;

use prodtrack_ca_client::types::{
    CaMessage, CaResponse, EnrollRequest, EnrollResult, RegisterRequest, RegisterResult,
};
use prodtrack_core::{Organization, Timestamp, UserId};
use prodtrack_crypto::{Certificate, CertificateRole, Ed25519PublicKey, Ed25519Signature};
use prodtrack_ledger::types::{
    GatewayErrorBody, GatewayErrorDetail, InvokeRequest, InvokeResponse, HEADER_CERTIFICATE,
    HEADER_MSP_ID, HEADER_SIGNATURE,
};
use prodtrack_ledger::{Caller, ContractError, ErrorCode};

use crate::store::StubState;

/// Build the complete stub router.
pub fn router(state: StubState) -> Router {
    Router::new()
        .route("/health", get(health))
        // Enrollment authority
        .route("/api/v1/register", post(ca_register))
        .route("/api/v1/enroll", post(ca_enroll))
        // Gateway
        .route(
            "/api/v1/channels/{channel}/chaincodes/{chaincode}/{action}",
            post(invoke),
        )
        .fallback(not_implemented)
        .with_state(state)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn not_implemented() -> Response {
    (
        StatusCode::NOT_IMPLEMENTED,
        Json(serde_json::json!({ "error": "not implemented in network stub" })),
    )
        .into_response()
}

// ── Enrollment authority ────────────────────────────────────────────

fn ca_success<T: Serialize>(result: T) -> Response {
    let body = CaResponse {
        success: true,
        result: Some(result),
        errors: Vec::new(),
        messages: Vec::new(),
    };
    (StatusCode::CREATED, Json(body)).into_response()
}

fn ca_failure(status: StatusCode, message: impl Into<String>) -> Response {
    let body = CaResponse::<()> {
        success: false,
        result: None,
        errors: vec![CaMessage {
            code: i64::from(status.as_u16()),
            message: message.into(),
        }],
        messages: Vec::new(),
    };
    (status, Json(body)).into_response()
}

/// `ca-org1` → Org1.
fn org_for_caname(caname: &str) -> Option<Organization> {
    caname
        .strip_prefix("ca-")
        .and_then(|name| Organization::resolve(name).ok())
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, String> {
    serde_json::from_slice(body).map_err(|e| format!("malformed request body: {e}"))
}

async fn ca_register(State(state): State<StubState>, headers: HeaderMap, body: Bytes) -> Response {
    let registrar = match registrar(&state, &headers, &body) {
        Ok(cert) => cert,
        Err(reason) => {
            tracing::warn!(%reason, "register rejected");
            return ca_failure(StatusCode::UNAUTHORIZED, "Authorization failure");
        }
    };
    let req: RegisterRequest = match parse_body(&body) {
        Ok(req) => req,
        Err(message) => return ca_failure(StatusCode::BAD_REQUEST, message),
    };
    let Some(org) = org_for_caname(&req.caname) else {
        return ca_failure(
            StatusCode::NOT_FOUND,
            format!("CA '{}' does not exist", req.caname),
        );
    };
    if registrar.role != CertificateRole::Admin || registrar.msp_id != org.msp_id() {
        return ca_failure(
            StatusCode::FORBIDDEN,
            format!("'{}' may not register identities with {}", registrar.subject, req.caname),
        );
    }

    match state.register(org, &req.id, &req.affiliation) {
        Some(secret) => {
            tracing::info!(%org, id = %req.id, registrar = %registrar.subject, "identity registered");
            ca_success(RegisterResult { secret })
        }
        None => ca_failure(
            StatusCode::BAD_REQUEST,
            format!("Identity '{}' is already registered", req.id),
        ),
    }
}

/// Certificate of the registrar, checked against the CA key and the body
/// signature.
fn registrar(state: &StubState, headers: &HeaderMap, body: &[u8]) -> Result<Certificate, String> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or("missing registrar token")?;
    let (cert_b64, sig_b64) = token.split_once('.').ok_or("malformed registrar token")?;
    let certificate = decode_certificate(state, cert_b64)?;
    let signature = Ed25519Signature::from_base64(sig_b64).map_err(|e| e.to_string())?;
    certificate
        .public_key
        .verify(body, &signature)
        .map_err(|e| e.to_string())?;
    Ok(certificate)
}

async fn ca_enroll(State(state): State<StubState>, headers: HeaderMap, body: Bytes) -> Response {
    let Some(Authorization(basic)) = headers.typed_get::<Authorization<Basic>>() else {
        return ca_failure(StatusCode::UNAUTHORIZED, "Authorization failure");
    };
    let req: EnrollRequest = match parse_body(&body) {
        Ok(req) => req,
        Err(message) => return ca_failure(StatusCode::BAD_REQUEST, message),
    };
    let Some(org) = org_for_caname(&req.caname) else {
        return ca_failure(
            StatusCode::NOT_FOUND,
            format!("CA '{}' does not exist", req.caname),
        );
    };
    let Some(registration) = state.authenticate(org, basic.username(), basic.password()) else {
        return ca_failure(StatusCode::UNAUTHORIZED, "Authentication failure");
    };
    let public_key = match Ed25519PublicKey::from_hex(&req.public_key) {
        Ok(key) => key,
        Err(e) => return ca_failure(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let issued = Certificate::issue(
        state.ca_key(),
        org.ca_host(),
        basic.username(),
        org.msp_id(),
        registration.role,
        registration.affiliation,
        public_key,
        Timestamp::now(),
    )
    .and_then(|cert| cert.to_pem());
    match issued {
        Ok(pem) => {
            tracing::info!(%org, id = basic.username(), "certificate issued");
            ca_success(EnrollResult {
                cert: STANDARD.encode(pem),
            })
        }
        Err(e) => {
            tracing::error!(error = %e, "certificate issuance failed");
            ca_failure(StatusCode::INTERNAL_SERVER_ERROR, "certificate issuance failed")
        }
    }
}

// ── Gateway ─────────────────────────────────────────────────────────

fn gateway_failure(err: ContractError) -> Response {
    let status = match err.code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::AccessDenied => StatusCode::FORBIDDEN,
        ErrorCode::Conflict | ErrorCode::InvalidTransition => StatusCode::CONFLICT,
        ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
    };
    let body = GatewayErrorBody {
        error: GatewayErrorDetail {
            code: err.code,
            message: err.message,
        },
    };
    (status, Json(body)).into_response()
}

async fn invoke(
    State(state): State<StubState>,
    Path((channel, chaincode, action)): Path<(String, String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let caller = match gateway_caller(&state, &headers, &body) {
        Ok(caller) => caller,
        Err(reason) => {
            tracing::warn!(%reason, "gateway request rejected");
            return gateway_failure(ContractError::new(ErrorCode::Unauthorized, reason));
        }
    };
    let req: InvokeRequest = match parse_body(&body) {
        Ok(req) => req,
        Err(message) => return gateway_failure(ContractError::bad_request(message)),
    };

    let contract = state.contract();
    let outcome = match action.as_str() {
        "submit" => {
            let tx_id = uuid::Uuid::new_v4().simple().to_string();
            contract
                .submit(&caller, &req.function, &req.args, &tx_id)
                .map(|payload| (payload, Some(tx_id)))
        }
        "evaluate" => contract
            .evaluate(&caller, &req.function, &req.args)
            .map(|payload| (payload, None)),
        _ => return not_implemented().await,
    };

    match outcome {
        Ok((payload, transaction_id)) => {
            tracing::debug!(
                %channel,
                %chaincode,
                %action,
                function = %req.function,
                user = %caller.user,
                "contract invoked"
            );
            Json(InvokeResponse {
                payload: STANDARD.encode(payload),
                transaction_id,
            })
            .into_response()
        }
        Err(e) => {
            tracing::debug!(function = %req.function, code = %e.code, error = %e, "contract rejected");
            gateway_failure(e)
        }
    }
}

/// The invoking identity, proven by a CA-issued certificate and a
/// signature over the body.
fn gateway_caller(state: &StubState, headers: &HeaderMap, body: &[u8]) -> Result<Caller, String> {
    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| format!("missing {name} header"))
    };
    let certificate = decode_certificate(state, header_str(HEADER_CERTIFICATE)?)?;
    if header_str(HEADER_MSP_ID)? != certificate.msp_id {
        return Err("MSP id header does not match certificate".to_string());
    }
    let signature =
        Ed25519Signature::from_base64(header_str(HEADER_SIGNATURE)?).map_err(|e| e.to_string())?;
    certificate
        .public_key
        .verify(body, &signature)
        .map_err(|e| e.to_string())?;

    let org = Organization::from_msp_id(&certificate.msp_id)
        .ok_or_else(|| format!("unknown MSP {}", certificate.msp_id))?;
    let user = UserId::new(certificate.subject).map_err(|e| e.to_string())?;
    Ok(Caller::new(org, user))
}

fn decode_certificate(state: &StubState, b64: &str) -> Result<Certificate, String> {
    let pem = STANDARD
        .decode(b64.trim())
        .map_err(|e| format!("certificate is not base64: {e}"))?;
    let pem = String::from_utf8(pem).map_err(|e| format!("certificate is not UTF-8: {e}"))?;
    let certificate = Certificate::from_pem(&pem).map_err(|e| e.to_string())?;
    certificate
        .verify_issuer(&state.ca_public_key())
        .map_err(|_| "certificate was not issued by this authority".to_string())?;
    Ok(certificate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use prodtrack_crypto::Ed25519KeyPair;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_state() -> StubState {
        StubState::new(Ed25519KeyPair::from_seed(&[1u8; 32]), "admin", "adminpw")
    }

    async fn body_json(resp: Response) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn basic(id: &str, secret: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{id}:{secret}")))
    }

    /// Enroll `id` and return its certificate PEM and key.
    async fn enroll(app: &Router, caname: &str, id: &str, secret: &str) -> (String, Ed25519KeyPair) {
        let key = Ed25519KeyPair::generate();
        let req = axum::http::Request::builder()
            .method("POST")
            .uri("/api/v1/enroll")
            .header("authorization", basic(id, secret))
            .header("content-type", "application/json")
            .body(Body::from(
                json!({ "caname": caname, "publicKey": key.public_key().to_hex() }).to_string(),
            ))
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = body_json(resp).await;
        let pem = STANDARD
            .decode(body["result"]["Cert"].as_str().unwrap())
            .unwrap();
        (String::from_utf8(pem).unwrap(), key)
    }

    fn signed(uri: &str, auth: (&str, &str), body: Value) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .method("POST")
            .uri(uri)
            .header(auth.0, auth.1)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_ok_and_unknown_path_501() {
        let app = router(test_state());
        let req = axum::http::Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        assert_eq!(app.clone().oneshot(req).await.unwrap().status(), StatusCode::OK);

        let req = axum::http::Request::builder()
            .uri("/some/unknown/path")
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            app.oneshot(req).await.unwrap().status(),
            StatusCode::NOT_IMPLEMENTED
        );
    }

    #[tokio::test]
    async fn enroll_issues_certificate_for_registered_admin() {
        let state = test_state();
        let app = router(state.clone());
        let (pem, key) = enroll(&app, "ca-org2", "admin", "adminpw").await;
        let cert = Certificate::from_pem(&pem).unwrap();
        assert_eq!(cert.msp_id, "Org2MSP");
        assert_eq!(cert.role, CertificateRole::Admin);
        assert_eq!(cert.public_key, key.public_key());
        cert.verify_issuer(&state.ca_public_key()).unwrap();
    }

    #[tokio::test]
    async fn enroll_with_wrong_secret_is_401() {
        let app = router(test_state());
        let req = signed(
            "/api/v1/enroll",
            ("authorization", basic("admin", "nope").as_str()),
            json!({ "caname": "ca-org1", "publicKey": Ed25519KeyPair::generate().public_key().to_hex() }),
        );
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["errors"][0]["message"], "Authentication failure");
    }

    #[tokio::test]
    async fn register_requires_a_signed_admin_token() {
        let app = router(test_state());
        let (pem, key) = enroll(&app, "ca-org1", "admin", "adminpw").await;
        let body = json!({ "id": "acme", "type": "client", "affiliation": "org1.department1", "caname": "ca-org1" });
        let bytes = body.to_string();

        let unsigned = signed("/api/v1/register", ("authorization", "garbage"), body.clone());
        assert_eq!(
            app.clone().oneshot(unsigned).await.unwrap().status(),
            StatusCode::UNAUTHORIZED
        );

        let token = format!(
            "{}.{}",
            STANDARD.encode(&pem),
            key.sign(bytes.as_bytes()).to_base64()
        );
        let resp = app
            .clone()
            .oneshot(signed("/api/v1/register", ("authorization", &token), body.clone()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let secret = body_json(resp).await["result"]["secret"]
            .as_str()
            .unwrap()
            .to_string();

        let again = app
            .clone()
            .oneshot(signed("/api/v1/register", ("authorization", &token), body))
            .await
            .unwrap();
        assert_eq!(again.status(), StatusCode::BAD_REQUEST);

        let (user_pem, _) = enroll(&app, "ca-org1", "acme", &secret).await;
        let cert = Certificate::from_pem(&user_pem).unwrap();
        assert_eq!(cert.role, CertificateRole::Client);
        assert_eq!(cert.affiliation, "org1.department1");
    }

    #[tokio::test]
    async fn gateway_rejects_bad_signature_and_serves_signed_calls() {
        let app = router(test_state());
        let (pem, key) = enroll(&app, "ca-org1", "admin", "adminpw").await;
        let uri = "/api/v1/channels/mychannel/chaincodes/basic/evaluate";
        let body = json!({ "function": "GetAllProducts", "args": [] });
        let bytes = body.to_string();

        let forged = axum::http::Request::builder()
            .method("POST")
            .uri(uri)
            .header(HEADER_MSP_ID, "Org1MSP")
            .header(HEADER_CERTIFICATE, STANDARD.encode(&pem))
            .header(HEADER_SIGNATURE, Ed25519KeyPair::generate().sign(bytes.as_bytes()).to_base64())
            .body(Body::from(bytes.clone()))
            .unwrap();
        let resp = app.clone().oneshot(forged).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(resp).await["error"]["code"], "UNAUTHORIZED");

        let genuine = axum::http::Request::builder()
            .method("POST")
            .uri(uri)
            .header(HEADER_MSP_ID, "Org1MSP")
            .header(HEADER_CERTIFICATE, STANDARD.encode(&pem))
            .header(HEADER_SIGNATURE, key.sign(bytes.as_bytes()).to_base64())
            .body(Body::from(bytes))
            .unwrap();
        let resp = app.oneshot(genuine).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        let payload = STANDARD.decode(body["payload"].as_str().unwrap()).unwrap();
        assert_eq!(payload, b"[]");
        assert!(body.get("transactionId").is_none());
    }
}
