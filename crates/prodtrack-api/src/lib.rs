//! # prodtrack-api — HTTP Service
//!
//! ## API Surface
//!
//! | Route | Auth | Module |
//! |-------|------|--------|
//! | `POST /register`, `POST /users/login` | none | [`routes::users`] |
//! | `POST /createProduct`, `/updateProduct`, `/orderProduct`, `/acceptProductOrder`, `/shipProductOrder`, `/deliverProductOrder` | Bearer | [`routes::products`] |
//! | `GET /readProduct/{id}`, `/getProductHistory/{id}`, `/getAllProducts`, `/getProductStatus/{id}`, `/verifyProduct/{id}`; `POST /getProductListByManufacturerID`, `/getOrderedProductList`, `/getOrderRequestedProductList`, `/getConsumerProductOrderList` | Bearer | [`routes::queries`] |
//! | `GET /`, `GET /health/*` | none | here |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → CorsLayer → AuthMiddleware (product routes only) → Handler
//! ```
//!
//! The acting user and organization of every product route come from the
//! verified session token, never from the request body.

pub mod auth;
pub mod config;
pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;

use axum::http::{HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::AppError;
pub use state::AppState;

/// Assemble the application router.
pub fn app(state: AppState) -> Router {
    let products = Router::new()
        .merge(routes::products::router())
        .merge(routes::queries::router())
        .layer(from_fn_with_state(state.clone(), auth::auth_middleware));

    let public = Router::new()
        .merge(routes::users::router())
        .route("/", get(banner))
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness));

    Router::new()
        .merge(public)
        .merge(products)
        .layer(cors_layer(&state.config.cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let origin = match HeaderValue::from_str(origin) {
        Ok(value) => AllowOrigin::exact(value),
        Err(_) => {
            tracing::warn!(origin, "CORS origin is not a valid header value; allowing none");
            AllowOrigin::list(std::iter::empty())
        }
    };
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ])
}

async fn banner() -> &'static str {
    "This is the endpoint"
}

/// Liveness check: 200 while the process runs.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness check.
async fn readiness() -> &'static str {
    "ready"
}
