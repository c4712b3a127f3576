//! # Session Authentication
//!
//! Product routes require `Authorization: Bearer <session token>`. The
//! middleware verifies the token with the [`SessionBridge`] and injects a
//! [`CallerIdentity`] into the request extensions; handlers take it as an
//! extractor.
//!
//! [`SessionBridge`]: prodtrack_session::SessionBridge

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, HeaderMapExt};

use prodtrack_core::{Organization, UserId};

use crate::error::AppError;
use crate::state::AppState;

/// The verified caller of a product route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub user: UserId,
    pub org: Organization,
}

impl<S: Send + Sync> FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

/// Verify the bearer session token and attach the caller's identity.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(Authorization(bearer)) = request.headers().typed_get::<Authorization<Bearer>>()
    else {
        tracing::warn!("authentication failed: missing or non-Bearer authorization header");
        return AppError::Unauthorized("missing bearer session token".into()).into_response();
    };

    match state.sessions.verify_token(bearer.token()) {
        Ok(claims) => {
            tracing::debug!(user = %claims.sub, org = %claims.org, "authenticated request");
            request.extensions_mut().insert(CallerIdentity {
                user: claims.sub,
                org: claims.org,
            });
            next.run(request).await
        }
        Err(e) => {
            tracing::warn!(reason = %e, "authentication failed: session token rejected");
            AppError::from(e).into_response()
        }
    }
}
