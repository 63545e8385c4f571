pub mod auth;
pub mod credentials;
pub mod error;
pub mod guard;
pub mod message_store;
pub mod messages;
pub mod middleware;
pub mod routes;
pub mod tokens;
pub mod users;

use anyhow::anyhow;
use tracing::error;

pub use error::ApiError;

/// Run synchronous store work off the async runtime.
pub(crate) async fn run_blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(anyhow!("blocking task failed"))
    })?
}
