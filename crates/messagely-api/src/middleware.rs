use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::guard::{self, Identity};

/// Resolve the bearer token into an [`Identity`] request extension.
/// Requests without a valid token never reach the handler.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|token| state.tokens.verify(token).ok())
        .map(Identity::new);

    let identity = guard::require_authenticated(identity)?;
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}
