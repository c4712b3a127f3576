//! # PEM Armour
//!
//! Minimal RFC 7468 text encoding: a `-----BEGIN <LABEL>-----` line,
//! standard base64 wrapped at 64 columns, and the matching END line.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::CryptoError;

const LINE_WIDTH: usize = 64;

/// Armour `bytes` under `label`.
pub fn encode(label: &str, bytes: &[u8]) -> String {
    let body = STANDARD.encode(bytes);
    let mut out = format!("-----BEGIN {label}-----\n");
    for chunk in body.as_bytes().chunks(LINE_WIDTH) {
        // base64 output is ASCII, so every chunk is valid UTF-8.
        out.push_str(&String::from_utf8_lossy(chunk));
        out.push('\n');
    }
    out.push_str(&format!("-----END {label}-----\n"));
    out
}

/// Strip the armour for `label` and decode the body.
pub fn decode(label: &str, pem: &str) -> Result<Vec<u8>, CryptoError> {
    let begin = format!("-----BEGIN {label}-----");
    let end = format!("-----END {label}-----");
    let text = pem.trim();
    let inner = text
        .strip_prefix(begin.as_str())
        .and_then(|rest| rest.strip_suffix(end.as_str()))
        .ok_or_else(|| CryptoError::Encoding(format!("expected a {label} PEM block")))?;
    let body: String = inner.split_whitespace().collect();
    STANDARD
        .decode(body)
        .map_err(|e| CryptoError::Encoding(format!("invalid base64 in {label} block: {e}")))
}
