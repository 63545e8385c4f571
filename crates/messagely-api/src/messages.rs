use axum::{
    Extension, Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};

use messagely_types::api::{MessageEnvelope, SendMessageRequest};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::guard::{self, Identity};
use crate::run_blocking;

/// GET /messages/{id}: visible to the sender and the recipient only.
pub async fn get_message(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = path?;
    let message = run_blocking(move || {
        let message = state.messages.get(id)?;
        guard::require_participant(&identity, &message)?;
        Ok(message)
    })
    .await?;

    Ok(Json(MessageEnvelope { message }))
}

/// POST /messages: the sender is always the session identity.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    if req.to_username.is_empty() {
        return Err(ApiError::BadRequest("to_username required".into()));
    }

    let message = run_blocking(move || {
        state.messages.create(&identity.username, &req.to_username, &req.body)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(MessageEnvelope { message })))
}

/// POST /messages/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = path?;
    let message = run_blocking(move || state.messages.mark_read(id, &identity)).await?;
    Ok(Json(MessageEnvelope { message }))
}
