//! # Product Query Routes
//!
//! Read-only routes; each evaluates a contract query as the caller.
//!
//! | Method | Path | Success |
//! |--------|------|---------|
//! | GET | `/readProduct/{id}` | `{success, result: Product}` |
//! | GET | `/getProductHistory/{id}` | `{success, message, data: [HistoryEntry]}` |
//! | GET | `/getAllProducts` | `{success, message, data: [Product]}`, 404 when empty |
//! | GET | `/getProductStatus/{id}` | `{success, result: "Pending" \| ...}` |
//! | GET | `/verifyProduct/{id}` | `{success, result: bool}` |
//! | POST | `/getProductListByManufacturerID` | `{success, message, data}`, 404 when empty |
//! | POST | `/getOrderedProductList` | `{success, result}` |
//! | POST | `/getOrderRequestedProductList` | `{success, result}` or `{success, message}` when empty |
//! | POST | `/getConsumerProductOrderList` | `{success, result}` or `{success, message}` when empty |

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use prodtrack_core::{ProductId, UserId};
use prodtrack_state::{HistoryEntry, Product, ProductStatus};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::extract_json;
use crate::routes::Envelope;
use crate::state::AppState;

const EMPTY_LIST: &str = "The product list is empty.";
const PRODUCTS_LOADED: &str = "Products loaded Successfully.";
const HISTORY_LOADED: &str = "Products Transaction loaded Successfully.";

/// Optional body of the list routes. Older clients send the user and
/// organization here; only `userName` on the manufacturer listing is used.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRequest {
    pub user_name: Option<String>,
    pub org_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Found<T: Serialize> {
    pub result: T,
}

#[derive(Debug, Serialize)]
pub struct Loaded<T: Serialize> {
    pub message: &'static str,
    pub data: T,
}

/// A listing that reports an empty result as a message instead of an
/// empty array.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Listing {
    Products { result: Vec<Product> },
    Empty { message: &'static str },
}

impl From<Vec<Product>> for Listing {
    fn from(products: Vec<Product>) -> Self {
        if products.is_empty() {
            Self::Empty {
                message: EMPTY_LIST,
            }
        } else {
            Self::Products { result: products }
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/readProduct/{id}", get(read_product))
        .route("/getProductHistory/{id}", get(product_history))
        .route("/getAllProducts", get(all_products))
        .route("/getProductStatus/{id}", get(product_status))
        .route("/verifyProduct/{id}", get(verify_product))
        .route(
            "/getProductListByManufacturerID",
            post(products_by_manufacturer),
        )
        .route("/getOrderedProductList", post(ordered_products))
        .route("/getOrderRequestedProductList", post(order_requested_products))
        .route("/getConsumerProductOrderList", post(consumer_orders))
}

/// GET /readProduct/{id}
async fn read_product(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Found<Product>>>, AppError> {
    let id = ProductId::parse(id)?;
    let engine = state.engine(caller.org, &caller.user).await?;
    let product = engine
        .read_product(&id)
        .await
        .map_err(|e| AppError::from(e).context(format!("Failed to read product {id}")))?;
    Ok(Envelope::ok(Found { result: product }))
}

/// GET /getProductHistory/{id}
async fn product_history(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Loaded<Vec<HistoryEntry>>>>, AppError> {
    let id = ProductId::parse(id)?;
    let engine = state.engine(caller.org, &caller.user).await?;
    let history = engine.read_history(&id).await.map_err(|e| {
        AppError::from(e).context(format!("Failed to read history of product {id}"))
    })?;
    Ok(Envelope::ok(Loaded {
        message: HISTORY_LOADED,
        data: history,
    }))
}

/// GET /getAllProducts
async fn all_products(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Envelope<Loaded<Vec<Product>>>>, AppError> {
    let engine = state.engine(caller.org, &caller.user).await?;
    let products = engine
        .list_all()
        .await
        .map_err(|e| AppError::from(e).context("Failed to read products"))?;
    loaded_or_not_found(products)
}

/// GET /getProductStatus/{id}
async fn product_status(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Found<ProductStatus>>>, AppError> {
    let id = ProductId::parse(id)?;
    let engine = state.engine(caller.org, &caller.user).await?;
    let status = engine.product_status(&id).await.map_err(|e| {
        AppError::from(e).context(format!("Failed to read status of product {id}"))
    })?;
    Ok(Envelope::ok(Found { result: status }))
}

/// GET /verifyProduct/{id}: whether the id was ever created on the ledger.
async fn verify_product(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Found<bool>>>, AppError> {
    let id = ProductId::parse(id)?;
    let engine = state.engine(caller.org, &caller.user).await?;
    let authentic = engine
        .verify_product(&id)
        .await
        .map_err(|e| AppError::from(e).context(format!("Failed to verify product {id}")))?;
    Ok(Envelope::ok(Found { result: authentic }))
}

/// POST /getProductListByManufacturerID: `userName` in the body, defaulting
/// to the caller.
async fn products_by_manufacturer(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Option<Json<ListRequest>>, JsonRejection>,
) -> Result<Json<Envelope<Loaded<Vec<Product>>>>, AppError> {
    let req = list_request(body)?;
    let manufacturer = match req.user_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => UserId::new(name)?,
        _ => caller.user.clone(),
    };
    let engine = state.engine(caller.org, &caller.user).await?;
    let products = engine
        .list_by_manufacturer(&manufacturer)
        .await
        .map_err(|e| AppError::from(e).context("Failed to read products"))?;
    loaded_or_not_found(products)
}

/// POST /getOrderedProductList: products the caller has ordered.
async fn ordered_products(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Envelope<Found<Vec<Product>>>>, AppError> {
    let engine = state.engine(caller.org, &caller.user).await?;
    let products = engine
        .list_ordered_by_consumer(&caller.user)
        .await
        .map_err(|e| AppError::from(e).context("Failed to read products"))?;
    Ok(Envelope::ok(Found { result: products }))
}

/// POST /getOrderRequestedProductList: the caller's products awaiting acceptance.
async fn order_requested_products(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Envelope<Listing>>, AppError> {
    let engine = state.engine(caller.org, &caller.user).await?;
    let products = engine
        .list_order_requested(&caller.user)
        .await
        .map_err(|e| AppError::from(e).context("Failed to read requested order product"))?;
    Ok(Envelope::ok(Listing::from(products)))
}

/// POST /getConsumerProductOrderList
async fn consumer_orders(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Envelope<Listing>>, AppError> {
    let engine = state.engine(caller.org, &caller.user).await?;
    let products = engine
        .list_ordered_by_consumer(&caller.user)
        .await
        .map_err(|e| AppError::from(e).context("Failed to read requested order product"))?;
    Ok(Envelope::ok(Listing::from(products)))
}

/// The body is optional: no `Content-Type: application/json` means defaults.
fn list_request(
    body: Result<Option<Json<ListRequest>>, JsonRejection>,
) -> Result<ListRequest, AppError> {
    match body {
        Ok(Some(Json(req))) => Ok(req),
        Ok(None) => Ok(ListRequest::default()),
        Err(rejection) => extract_json::<ListRequest>(Err(rejection)),
    }
}

fn loaded_or_not_found(
    products: Vec<Product>,
) -> Result<Json<Envelope<Loaded<Vec<Product>>>>, AppError> {
    if products.is_empty() {
        return Err(AppError::NotFound(EMPTY_LIST.to_string()));
    }
    Ok(Envelope::ok(Loaded {
        message: PRODUCTS_LOADED,
        data: products,
    }))
}
