//! # Enrollment Certificates
//!
//! The statement an enrollment authority issues when it enrolls an
//! identity: subject, MSP id, role and affiliation bound to an Ed25519
//! public key, signed by the authority's own key.
//!
//! Certificates travel as PEM text (`-----BEGIN CERTIFICATE-----`) whose
//! body is the base64 of the JSON document below. The issuer signature
//! covers the JSON with the `signature` field absent.

use serde::{Deserialize, Serialize};

use prodtrack_core::Timestamp;

use crate::ed25519::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
use crate::error::CryptoError;
use crate::pem;

const CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// Role the identity was registered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificateRole {
    /// Organization administrator, allowed to register users.
    Admin,
    /// End user.
    Client,
}

/// A signed enrollment certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    /// Enrolled user id.
    pub subject: String,
    /// Membership service provider id (`Org1MSP`, ...).
    pub msp_id: String,
    /// Registered role.
    pub role: CertificateRole,
    /// Registered affiliation (`org1.department1`).
    pub affiliation: String,
    /// The subject's public key.
    pub public_key: Ed25519PublicKey,
    /// Authority-assigned serial number.
    pub serial: String,
    /// Issuance time.
    pub issued_at: Timestamp,
    /// Issuing authority name (`ca.org1.example.com`).
    pub issuer: String,
    /// Issuer signature over the unsigned body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Ed25519Signature>,
}

impl Certificate {
    /// Build and sign a certificate with the issuer's key.
    #[allow(clippy::too_many_arguments)]
    pub fn issue(
        issuer_key: &Ed25519KeyPair,
        issuer: impl Into<String>,
        subject: impl Into<String>,
        msp_id: impl Into<String>,
        role: CertificateRole,
        affiliation: impl Into<String>,
        public_key: Ed25519PublicKey,
        issued_at: Timestamp,
    ) -> Result<Self, CryptoError> {
        let mut cert = Self {
            subject: subject.into(),
            msp_id: msp_id.into(),
            role,
            affiliation: affiliation.into(),
            public_key,
            serial: uuid::Uuid::new_v4().simple().to_string(),
            issued_at,
            issuer: issuer.into(),
            signature: None,
        };
        let payload = cert.signing_payload()?;
        cert.signature = Some(issuer_key.sign(&payload));
        Ok(cert)
    }

    /// Bytes the issuer signature covers.
    pub fn signing_payload(&self) -> Result<Vec<u8>, CryptoError> {
        let unsigned = Self {
            signature: None,
            ..self.clone()
        };
        serde_json::to_vec(&unsigned)
            .map_err(|e| CryptoError::Certificate(format!("cannot encode certificate: {e}")))
    }

    /// Check the issuer signature against the authority's public key.
    pub fn verify_issuer(&self, issuer_key: &Ed25519PublicKey) -> Result<(), CryptoError> {
        let signature = self
            .signature
            .as_ref()
            .ok_or_else(|| CryptoError::Certificate("certificate is unsigned".to_string()))?;
        issuer_key.verify(&self.signing_payload()?, signature)
    }

    /// Encode as PEM text.
    pub fn to_pem(&self) -> Result<String, CryptoError> {
        let body = serde_json::to_vec(self)
            .map_err(|e| CryptoError::Certificate(format!("cannot encode certificate: {e}")))?;
        Ok(pem::encode(CERTIFICATE_LABEL, &body))
    }

    /// Decode PEM text.
    pub fn from_pem(pem_text: &str) -> Result<Self, CryptoError> {
        let body = pem::decode(CERTIFICATE_LABEL, pem_text)?;
        serde_json::from_slice(&body)
            .map_err(|e| CryptoError::Certificate(format!("malformed certificate body: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue_for(subject_key: &Ed25519KeyPair, ca: &Ed25519KeyPair) -> Certificate {
        Certificate::issue(
            ca,
            "ca.org1.example.com",
            "alice",
            "Org1MSP",
            CertificateRole::Client,
            "org1.department1",
            subject_key.public_key(),
            Timestamp::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let ca = Ed25519KeyPair::generate();
        let cert = issue_for(&Ed25519KeyPair::generate(), &ca);
        cert.verify_issuer(&ca.public_key()).unwrap();
        assert_eq!(cert.serial.len(), 32);
    }

    #[test]
    fn test_verify_rejects_other_issuer() {
        let cert = issue_for(&Ed25519KeyPair::generate(), &Ed25519KeyPair::generate());
        let other = Ed25519KeyPair::generate();
        assert!(cert.verify_issuer(&other.public_key()).is_err());
    }

    #[test]
    fn test_tampered_subject_fails_verification() {
        let ca = Ed25519KeyPair::generate();
        let mut cert = issue_for(&Ed25519KeyPair::generate(), &ca);
        cert.subject = "mallory".to_string();
        assert!(cert.verify_issuer(&ca.public_key()).is_err());
    }

    #[test]
    fn test_pem_roundtrip_preserves_signature() {
        let ca = Ed25519KeyPair::generate();
        let cert = issue_for(&Ed25519KeyPair::generate(), &ca);
        let pem_text = cert.to_pem().unwrap();
        assert!(pem_text.starts_with("-----BEGIN CERTIFICATE-----"));
        let back = Certificate::from_pem(&pem_text).unwrap();
        assert_eq!(back, cert);
        back.verify_issuer(&ca.public_key()).unwrap();
    }

    #[test]
    fn test_unsigned_certificate_rejected() {
        let ca = Ed25519KeyPair::generate();
        let mut cert = issue_for(&Ed25519KeyPair::generate(), &ca);
        cert.signature = None;
        assert!(matches!(
            cert.verify_issuer(&ca.public_key()),
            Err(CryptoError::Certificate(_))
        ));
    }
}
