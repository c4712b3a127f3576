//! # Request Extraction
//!
//! [`Validate`] for request DTOs, JSON extraction that maps rejections to
//! [`AppError::BadRequest`], and the lenient field shapes the UI sends.

use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde::{Deserialize, Deserializer};

use prodtrack_core::ProductId;

use crate::error::AppError;

/// Business-rule validation beyond what serde checks.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and validate it.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::BadRequest)?;
    Ok(value)
}

/// Product id carried in a body field named `token`: either the bare id or
/// `{ "token": "<id>" }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRef(pub String);

impl ProductRef {
    pub fn parse(&self) -> Result<ProductId, AppError> {
        Ok(ProductId::parse(self.0.as_str())?)
    }
}

impl<'de> Deserialize<'de> for ProductRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Shape {
            Bare(String),
            Wrapped { token: String },
        }
        Ok(match Shape::deserialize(deserializer)? {
            Shape::Bare(id) | Shape::Wrapped { token: id } => Self(id),
        })
    }
}

/// A price sent either as a JSON string or a JSON number.
///
/// Strings are kept verbatim. Numbers are normalised to their canonical
/// JSON rendering: integers as written, anything with a fraction or
/// exponent as the shortest decimal for its `f64` value (`5.00` becomes
/// `"5.0"`, `1e2` becomes `"100.0"`). Clients that need an exact textual
/// price send a string.
pub fn price_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Shape {
        Text(String),
        Number(serde_json::Number),
    }
    Ok(match Shape::deserialize(deserializer)? {
        Shape::Text(s) => s,
        Shape::Number(n) => n.to_string(),
    })
}

/// Reject missing or blank string fields with the UI's message shape.
pub fn require(field: &Option<String>, name: &str) -> Result<(), String> {
    match field {
        Some(value) if !value.trim().is_empty() => Ok(()),
        _ => Err(format!("{name} is missing")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Body {
        token: ProductRef,
        #[serde(deserialize_with = "price_text")]
        price: String,
    }

    #[test]
    fn test_product_ref_accepts_both_shapes() {
        let bare: Body = serde_json::from_str(r#"{"token":"p1","price":"10"}"#).unwrap();
        let wrapped: Body =
            serde_json::from_str(r#"{"token":{"token":"p1"},"price":"10"}"#).unwrap();
        assert_eq!(bare.token, ProductRef("p1".into()));
        assert_eq!(wrapped.token, ProductRef("p1".into()));
        assert!(serde_json::from_str::<Body>(r#"{"token":7,"price":"10"}"#).is_err());
    }

    #[test]
    fn test_price_accepts_string_or_number() {
        let a: Body = serde_json::from_str(r#"{"token":"p","price":12.5}"#).unwrap();
        let b: Body = serde_json::from_str(r#"{"token":"p","price":"12.5"}"#).unwrap();
        assert_eq!(a.price, "12.5");
        assert_eq!(b.price, "12.5");
    }

    #[test]
    fn test_numeric_price_is_normalised_and_string_price_is_verbatim() {
        let parse = |json: &str| serde_json::from_str::<Body>(json).unwrap().price;
        assert_eq!(parse(r#"{"token":"p","price":15}"#), "15");
        assert_eq!(parse(r#"{"token":"p","price":5.00}"#), "5.0");
        assert_eq!(parse(r#"{"token":"p","price":1e2}"#), "100.0");
        assert_eq!(parse(r#"{"token":"p","price":"5.00"}"#), "5.00");
        assert!(serde_json::from_str::<Body>(r#"{"token":"p","price":null}"#).is_err());
        assert!(serde_json::from_str::<Body>(r#"{"token":"p","price":[5]}"#).is_err());
    }

    #[test]
    fn test_require() {
        assert!(require(&Some("alice".into()), "username").is_ok());
        assert_eq!(
            require(&Some("  ".into()), "username").unwrap_err(),
            "username is missing"
        );
        assert!(require(&None, "orgName").is_err());
    }
}
