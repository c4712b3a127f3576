//! Contract tests for AuthorityClient against a mocked enrollment authority.
//!
//! ## Endpoints Tested
//!
//! | Method | Path | Test |
//! |--------|------|------|
//! | POST | `/api/v1/register` | `register_*` |
//! | POST | `/api/v1/enroll` | `enroll_*` |

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use wiremock::matchers::{basic_auth, body_partial_json, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zeroize::Zeroizing;

use prodtrack_ca_client::{CaConfig, EnrollmentError, EnrollmentService};
use prodtrack_core::{Organization, Timestamp, UserId};
use prodtrack_crypto::{Certificate, CertificateRole, Ed25519KeyPair};
use prodtrack_wallet::{IdentityRecord, InMemoryWallet};

fn test_service(mock_server: &MockServer) -> EnrollmentService {
    let config = CaConfig::local_mock(&mock_server.uri()).unwrap();
    EnrollmentService::new(config, Arc::new(InMemoryWallet::new())).unwrap()
}

fn admin_record(org: Organization) -> IdentityRecord {
    let ca = Ed25519KeyPair::from_seed(&[1u8; 32]);
    let key = Ed25519KeyPair::generate();
    let cert = Certificate::issue(
        &ca,
        org.ca_host(),
        "admin",
        org.msp_id(),
        CertificateRole::Admin,
        org.default_affiliation(),
        key.public_key(),
        Timestamp::now(),
    )
    .unwrap();
    IdentityRecord::new(
        org,
        UserId::admin(),
        cert.to_pem().unwrap(),
        key.to_private_pem(),
        None,
    )
    .unwrap()
}

// -- POST /api/v1/register ----------------------------------------------

#[tokio::test]
async fn register_sends_registrar_token_and_returns_secret() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/register"))
        .and(header_exists("authorization"))
        .and(body_partial_json(serde_json::json!({
            "id": "alice",
            "type": "client",
            "affiliation": "org1.department1",
            "caname": "ca-org1"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "success": true,
            "result": { "secret": "xyzzy" },
            "errors": [],
            "messages": []
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = test_service(&mock_server);
    let admin = admin_record(Organization::Org1);
    let secret = service
        .authority(Organization::Org1)
        .unwrap()
        .register(&admin, "alice", "org1.department1")
        .await
        .unwrap();
    assert_eq!(secret.as_str(), "xyzzy");
}

#[tokio::test]
async fn register_token_signature_covers_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/register"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "success": true,
            "result": { "secret": "s" }
        })))
        .mount(&mock_server)
        .await;

    let service = test_service(&mock_server);
    let admin = admin_record(Organization::Org2);
    service
        .authority(Organization::Org2)
        .unwrap()
        .register(&admin, "bob", "org2.department1")
        .await
        .unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let token = requests[0]
        .headers
        .get("authorization")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let (cert_b64, sig_b64) = token.split_once('.').unwrap();
    let cert_pem = String::from_utf8(STANDARD.decode(cert_b64).unwrap()).unwrap();
    assert_eq!(cert_pem, admin.certificate_pem());
    let signature = prodtrack_crypto::Ed25519Signature::from_base64(sig_b64).unwrap();
    admin
        .certificate()
        .public_key
        .verify(&requests[0].body, &signature)
        .unwrap();
}

#[tokio::test]
async fn register_rejection_surfaces_authority_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/register"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "success": false,
            "result": null,
            "errors": [{ "code": 74, "message": "Identity 'alice' is already registered" }],
            "messages": []
        })))
        .mount(&mock_server)
        .await;

    let service = test_service(&mock_server);
    let admin = admin_record(Organization::Org1);
    let err = service
        .authority(Organization::Org1)
        .unwrap()
        .register(&admin, "alice", "org1.department1")
        .await
        .unwrap_err();
    match err {
        EnrollmentError::Authority {
            status, message, ..
        } => {
            assert_eq!(status, 400);
            assert!(message.contains("already registered"));
        }
        other => panic!("expected Authority error, got {other:?}"),
    }
}

#[tokio::test]
async fn register_server_error_with_plain_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/register"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&mock_server)
        .await;

    let service = test_service(&mock_server);
    let admin = admin_record(Organization::Org1);
    let err = service
        .authority(Organization::Org1)
        .unwrap()
        .register(&admin, "alice", "org1.department1")
        .await
        .unwrap_err();
    match err {
        EnrollmentError::Authority {
            status, message, ..
        } => {
            assert_eq!(status, 500);
            assert_eq!(message, "upstream exploded");
        }
        other => panic!("expected Authority error, got {other:?}"),
    }
}

// -- POST /api/v1/enroll ------------------------------------------------

#[tokio::test]
async fn enroll_uses_basic_auth_and_decodes_certificate() {
    let mock_server = MockServer::start().await;
    let admin = admin_record(Organization::Org1);
    let key = admin.key_pair().unwrap();

    Mock::given(method("POST"))
        .and(path("/api/v1/enroll"))
        .and(basic_auth("admin", "adminpw"))
        .and(body_partial_json(serde_json::json!({
            "caname": "ca-org1",
            "publicKey": key.public_key().to_hex()
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "result": { "Cert": STANDARD.encode(admin.certificate_pem()) }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = test_service(&mock_server);
    let pem = service
        .authority(Organization::Org1)
        .unwrap()
        .enroll("admin", "adminpw", &key.public_key())
        .await
        .unwrap();
    assert_eq!(pem, admin.certificate_pem());
}

#[tokio::test]
async fn enroll_rejects_non_base64_certificate() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/enroll"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "result": { "Cert": "%%% not base64 %%%" }
        })))
        .mount(&mock_server)
        .await;

    let service = test_service(&mock_server);
    let key = Ed25519KeyPair::generate();
    let err = service
        .authority(Organization::Org2)
        .unwrap()
        .enroll("admin", "adminpw", &key.public_key())
        .await
        .unwrap_err();
    assert!(matches!(err, EnrollmentError::Deserialization { .. }));
}

#[tokio::test]
async fn enroll_wrong_secret_is_authority_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/enroll"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "success": false,
            "errors": [{ "code": 20, "message": "Authentication failure" }]
        })))
        .mount(&mock_server)
        .await;

    let service = test_service(&mock_server);
    let key = Ed25519KeyPair::generate();
    let err = service
        .authority(Organization::Org1)
        .unwrap()
        .enroll("admin", &Zeroizing::new("wrong".to_string()), &key.public_key())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Authentication failure"));
}
