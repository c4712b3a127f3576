//! Wire types for the enrollment authority REST API.
//!
//! Every response is wrapped in the authority envelope
//! `{ "success": bool, "result": T, "errors": [...], "messages": [...] }`.

use serde::{Deserialize, Serialize};

/// `POST /api/v1/register` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// User id to register.
    pub id: String,
    /// Identity type (`client` for end users).
    #[serde(rename = "type")]
    pub kind: String,
    /// Affiliation, e.g. `org1.department1`.
    pub affiliation: String,
    /// Target CA name.
    pub caname: String,
}

/// `POST /api/v1/register` result.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegisterResult {
    /// One-time enrollment secret.
    pub secret: String,
}

/// `POST /api/v1/enroll` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollRequest {
    /// Target CA name.
    pub caname: String,
    /// Hex-encoded Ed25519 public key to certify.
    pub public_key: String,
}

/// `POST /api/v1/enroll` result.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EnrollResult {
    /// Base64 of the PEM certificate.
    #[serde(rename = "Cert")]
    pub cert: String,
}

/// One entry of the envelope's `errors` / `messages` arrays.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaMessage {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Response envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaResponse<T> {
    pub success: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub errors: Vec<CaMessage>,
    #[serde(default)]
    pub messages: Vec<CaMessage>,
}

impl<T> CaResponse<T> {
    /// Joined error messages, or a placeholder when the authority sent none.
    pub fn error_message(&self) -> String {
        if self.errors.is_empty() {
            return "request rejected without an error message".to_string();
        }
        self.errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}
