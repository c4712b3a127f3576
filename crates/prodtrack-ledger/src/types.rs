//! Wire types for the ledger gateway REST API.

use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;

/// Header carrying the caller's MSP id.
pub const HEADER_MSP_ID: &str = "x-msp-id";
/// Header carrying the base64 of the caller's certificate PEM.
pub const HEADER_CERTIFICATE: &str = "x-certificate";
/// Header carrying the base64 Ed25519 signature over the request body.
pub const HEADER_SIGNATURE: &str = "x-signature";

/// `POST .../submit` and `POST .../evaluate` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeRequest {
    /// Contract function name.
    pub function: String,
    /// Positional arguments.
    #[serde(default)]
    pub args: Vec<String>,
}

/// Successful gateway response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeResponse {
    /// Base64 of the bytes the function returned.
    pub payload: String,
    /// Set for submitted transactions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

/// Error body: `{"error": {"code": "...", "message": "..."}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayErrorBody {
    pub error: GatewayErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayErrorDetail {
    pub code: ErrorCode,
    pub message: String,
}
