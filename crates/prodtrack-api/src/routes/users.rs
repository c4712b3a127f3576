//! # Registration and Login
//!
//! | Method | Path | Body | Success |
//! |--------|------|------|---------|
//! | POST | `/register` | `{username, orgName}` | `{success, message: {secret, privateKey}}` |
//! | POST | `/users/login` | `{username, orgName, privateKey}` | `{success, message: {token}}` |
//!
//! `orgName` accepts `manufacturer`/`consumer`, `org1`/`org2` or the MSP id.
//! The private key returned by registration is the only copy the caller
//! gets; login proves possession of it.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use prodtrack_core::{Organization, UserId};
use prodtrack_ledger::Connector;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, require, Validate};
use crate::routes::Envelope;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub org_name: Option<String>,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), String> {
        require(&self.username, "username")?;
        require(&self.org_name, "orgName")
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: Option<String>,
    pub org_name: Option<String>,
    pub private_key: Option<String>,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("org_name", &self.org_name)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), String> {
        require(&self.username, "username")?;
        require(&self.org_name, "orgName")?;
        require(&self.private_key, "privateKey")
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub secret: String,
    pub private_key: String,
}

#[derive(Serialize)]
pub struct Registered {
    pub message: Credentials,
}

#[derive(Debug, Serialize)]
pub struct SessionIssued {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct LoggedIn {
    pub message: SessionIssued,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/users/login", post(login))
}

fn identify(username: Option<String>, org_name: Option<String>) -> Result<(UserId, Organization), AppError> {
    let user = UserId::new(username.unwrap_or_default())?;
    let org = Organization::resolve(&org_name.unwrap_or_default())?;
    Ok((user, org))
}

/// POST /register: register and enroll a new user.
async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<Envelope<Registered>>, AppError> {
    let req = extract_validated_json(body)?;
    let (user, org) = identify(req.username, req.org_name)?;
    let enrollment = state.enrollment.register_and_enroll(org, &user, None).await?;
    if state.ledger.release(org, &user) {
        tracing::debug!(%org, %user, "dropped ledger connection of a previous identity");
    }
    tracing::info!(%org, %user, "user registered");
    Ok(Envelope::ok(Registered {
        message: Credentials {
            secret: enrollment.secret.to_string(),
            private_key: enrollment.private_key_pem().to_string(),
        },
    }))
}

/// POST /users/login: prove possession of the identity's key, get a session token.
async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Envelope<LoggedIn>>, AppError> {
    let req = extract_validated_json(body)?;
    let private_key = req.private_key.unwrap_or_default();
    let (user, org) = identify(req.username, req.org_name)?;
    let token = state.sessions.authenticate(&user, org, &private_key)?;
    Ok(Envelope::ok(LoggedIn {
        message: SessionIssued {
            token: token.into_string(),
        },
    }))
}
