//! # Product Lifecycle Routes
//!
//! | Method | Path | Body | Org |
//! |--------|------|------|-----|
//! | POST | `/createProduct` | `{productName, productDescription, productPrice, createdDate?}` | manufacturer |
//! | POST | `/updateProduct` | `{productName, productDescription, productPrice, token}` | manufacturer |
//! | POST | `/orderProduct` | `{token}` | consumer |
//! | POST | `/acceptProductOrder` | `{token}` | manufacturer |
//! | POST | `/shipProductOrder` | `{token}` | manufacturer |
//! | POST | `/deliverProductOrder` | `{token}` | consumer |
//!
//! `token` is the product id. `userName` and `orgName` may still be sent by
//! older clients; they are accepted and ignored, the actor being the
//! session's user.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use prodtrack_core::{ProductId, Timestamp};
use prodtrack_lifecycle::{NewProduct, ProductEngine, ProductUpdate, Receipt};
use prodtrack_state::{Price, Product};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json, price_text, require, ProductRef, Validate};
use crate::routes::Envelope;
use crate::state::AppState;

// ---- Request types ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub product_name: Option<String>,
    #[serde(default)]
    pub product_description: String,
    #[serde(default, deserialize_with = "optional_price")]
    pub product_price: Option<String>,
    pub created_date: Option<String>,
}

impl Validate for CreateProductRequest {
    fn validate(&self) -> Result<(), String> {
        require(&self.product_name, "productName")?;
        require(&self.product_price, "productPrice")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub product_name: Option<String>,
    #[serde(default)]
    pub product_description: String,
    #[serde(default, deserialize_with = "optional_price")]
    pub product_price: Option<String>,
    pub token: ProductRef,
}

impl Validate for UpdateProductRequest {
    fn validate(&self) -> Result<(), String> {
        require(&self.product_name, "productName")?;
        require(&self.product_price, "productPrice")
    }
}

/// Body of the order, accept, ship and deliver routes.
#[derive(Debug, Deserialize)]
pub struct ProductActionRequest {
    pub token: ProductRef,
}

fn optional_price<'de, D: serde::Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    price_text(deserializer).map(Some)
}

// ---- Response types ----

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Committed {
    pub message: String,
    pub txn: Product,
    pub transaction_id: String,
}

#[derive(Debug, Serialize)]
pub struct Acknowledged {
    pub message: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/createProduct", post(create_product))
        .route("/updateProduct", post(update_product))
        .route("/orderProduct", post(order_product))
        .route("/acceptProductOrder", post(accept_order))
        .route("/shipProductOrder", post(ship_order))
        .route("/deliverProductOrder", post(deliver_order))
}

// ---- Handlers ----

/// POST /createProduct
async fn create_product(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<Json<Envelope<Committed>>, AppError> {
    let req = extract_validated_json(body)?;
    let price = Price::parse(req.product_price.unwrap_or_default())?;
    let created_at = match req.created_date.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Timestamp::parse_lenient(raw)?,
        _ => Timestamp::now(),
    };
    let engine = state.engine(caller.org, &caller.user).await?;
    let receipt = engine
        .create_product(NewProduct {
            name: req.product_name.unwrap_or_default(),
            description: req.product_description,
            price,
            created_at,
        })
        .await
        .map_err(|e| AppError::from(e).context("Fail to create product"))?;
    Ok(committed("Created product successfully!", receipt))
}

/// POST /updateProduct
async fn update_product(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<UpdateProductRequest>, JsonRejection>,
) -> Result<Json<Envelope<Committed>>, AppError> {
    let req = extract_validated_json(body)?;
    let id = req.token.parse()?;
    let price = Price::parse(req.product_price.unwrap_or_default())?;
    let engine = state.engine(caller.org, &caller.user).await?;
    let receipt = engine
        .update_product(
            &id,
            ProductUpdate {
                name: req.product_name.unwrap_or_default(),
                description: req.product_description,
                price,
                modified_at: Timestamp::now(),
            },
        )
        .await
        .map_err(|e| AppError::from(e).context(format!("Fail to update product with id {id}")))?;
    Ok(committed("Updated product successfully!", receipt))
}

/// POST /orderProduct
async fn order_product(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<ProductActionRequest>, JsonRejection>,
) -> Result<Json<Envelope<Acknowledged>>, AppError> {
    let (engine, id) = action_target(&state, &caller, body).await?;
    engine
        .order_product(&id, Timestamp::now())
        .await
        .map_err(|e| AppError::from(e).context(format!("Fail to order product with id {id}")))?;
    Ok(acknowledged(format!("Successfully Ordered product with id {id}!")))
}

/// POST /acceptProductOrder
async fn accept_order(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<ProductActionRequest>, JsonRejection>,
) -> Result<Json<Envelope<Acknowledged>>, AppError> {
    let (engine, id) = action_target(&state, &caller, body).await?;
    engine
        .accept_order(&id, Timestamp::now())
        .await
        .map_err(|e| {
            AppError::from(e).context(format!("Fail to accept product order with id {id}"))
        })?;
    Ok(acknowledged(format!(
        "Successfully accepted product order with id {id}!"
    )))
}

/// POST /shipProductOrder
async fn ship_order(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<ProductActionRequest>, JsonRejection>,
) -> Result<Json<Envelope<Acknowledged>>, AppError> {
    let (engine, id) = action_target(&state, &caller, body).await?;
    engine
        .ship_order(&id, Timestamp::now())
        .await
        .map_err(|e| {
            AppError::from(e).context(format!("Fail to ship product order with id {id}"))
        })?;
    Ok(acknowledged(format!(
        "Successfully shipped product order with id {id}!"
    )))
}

/// POST /deliverProductOrder
async fn deliver_order(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<ProductActionRequest>, JsonRejection>,
) -> Result<Json<Envelope<Acknowledged>>, AppError> {
    let (engine, id) = action_target(&state, &caller, body).await?;
    engine
        .deliver_order(&id, Timestamp::now())
        .await
        .map_err(|e| {
            AppError::from(e).context(format!("Fail to deliver product order with id {id}"))
        })?;
    Ok(acknowledged(format!(
        "Successfully delivered product order with id {id}!"
    )))
}

// ---- Helpers ----

async fn action_target(
    state: &AppState,
    caller: &CallerIdentity,
    body: Result<Json<ProductActionRequest>, JsonRejection>,
) -> Result<(ProductEngine, ProductId), AppError> {
    let req = extract_json(body)?;
    let id = req.token.parse()?;
    let engine = state.engine(caller.org, &caller.user).await?;
    Ok((engine, id))
}

fn committed(message: &str, receipt: Receipt) -> Json<Envelope<Committed>> {
    Envelope::ok(Committed {
        message: message.to_string(),
        txn: receipt.product,
        transaction_id: receipt.transaction_id,
    })
}

fn acknowledged(message: String) -> Json<Envelope<Acknowledged>> {
    Envelope::ok(Acknowledged { message })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_validation() {
        let ok: CreateProductRequest = serde_json::from_str(
            r#"{"userName":"acme","orgName":"manufacturer","productName":"Widget","productDescription":"Blue","productPrice":12.5}"#,
        )
        .unwrap();
        assert!(ok.validate().is_ok());
        assert_eq!(ok.product_price.as_deref(), Some("12.5"));

        let missing: CreateProductRequest =
            serde_json::from_str(r#"{"productDescription":"Blue","productPrice":"1"}"#).unwrap();
        assert_eq!(missing.validate().unwrap_err(), "productName is missing");

        let no_price: CreateProductRequest =
            serde_json::from_str(r#"{"productName":"Widget"}"#).unwrap();
        assert_eq!(no_price.validate().unwrap_err(), "productPrice is missing");
    }

    #[test]
    fn test_action_request_accepts_wrapped_token() {
        let req: ProductActionRequest =
            serde_json::from_str(r#"{"userName":"bob","token":{"token":"p1"}}"#).unwrap();
        assert_eq!(req.token, ProductRef("p1".into()));
    }
}
