use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};

use messagely_types::api::{LoginRequest, RegisterRequest, TokenResponse};

use crate::credentials::CredentialStore;
use crate::error::ApiError;
use crate::message_store::MessageStore;
use crate::run_blocking;
use crate::tokens::TokenIssuer;

const MAX_USERNAME_LEN: usize = 32;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub credentials: CredentialStore,
    pub messages: MessageStore,
    pub tokens: TokenIssuer,
}

/// POST /auth/register: create the user and log them straight in.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    validate_registration(&req)?;

    let s = state.clone();
    let user = run_blocking(move || s.credentials.register(&req)).await?;

    let token = state.tokens.issue(&user.username)?;
    Ok((StatusCode::CREATED, Json(TokenResponse { token })))
}

/// POST /auth/login: a wrong password and an unknown user are
/// indistinguishable to the caller.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    if req.username.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest("Username and password required".into()));
    }

    let s = state.clone();
    let username = req.username.clone();
    let authenticated = run_blocking(move || {
        let ok = s.credentials.authenticate(&req.username, &req.password)?;
        if ok {
            s.credentials.record_login(&req.username)?;
        }
        Ok(ok)
    })
    .await?;

    if !authenticated {
        warn!("Failed login for {}", username);
        return Err(ApiError::BadRequest("Invalid user/password".into()));
    }

    info!("{} logged in", username);
    let token = state.tokens.issue(&username)?;
    Ok(Json(TokenResponse { token }))
}

fn validate_registration(req: &RegisterRequest) -> Result<(), ApiError> {
    let len = req.username.chars().count();
    if len == 0 || len > MAX_USERNAME_LEN || req.username.chars().any(char::is_whitespace) {
        return Err(ApiError::BadRequest(format!(
            "Username must be 1-{} characters without whitespace",
            MAX_USERNAME_LEN
        )));
    }
    if req.password.is_empty() {
        return Err(ApiError::BadRequest("Password required".into()));
    }
    Ok(())
}
