use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};

use messagely_types::api::{MessagesEnvelope, UserEnvelope, UsersEnvelope};
use messagely_types::models::{ReceivedMessage, SentMessage};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::guard::{self, Identity};
use crate::run_blocking;

/// GET /users
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let users = run_blocking(move || state.credentials.list_all()).await?;
    Ok(Json(UsersEnvelope { users }))
}

/// GET /users/{username}: a user's own profile.
pub async fn get_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    guard::require_self(&identity, &username)?;
    let user = run_blocking(move || state.credentials.get(&username)).await?;
    Ok(Json(UserEnvelope { user }))
}

/// GET /users/{username}/from: outbox, recipient expanded.
pub async fn messages_from(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    guard::require_self(&identity, &username)?;
    let messages = run_blocking(move || state.messages.list_sent_by(&username)).await?;
    Ok(Json(MessagesEnvelope {
        messages: messages.into_iter().map(SentMessage::from).collect(),
    }))
}

/// GET /users/{username}/to: inbox, sender expanded.
pub async fn messages_to(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    guard::require_self(&identity, &username)?;
    let messages = run_blocking(move || state.messages.list_received_by(&username)).await?;
    Ok(Json(MessagesEnvelope {
        messages: messages.into_iter().map(ReceivedMessage::from).collect(),
    }))
}
