//! Access checks. The resolved identity is always passed in explicitly;
//! nothing here reads request-scoped state.

use tracing::warn;

use messagely_types::models::Message;

use crate::error::ApiError;

/// The caller, as established by a verified session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
}

impl Identity {
    pub fn new(username: impl Into<String>) -> Self {
        Self { username: username.into() }
    }
}

pub fn require_authenticated(identity: Option<Identity>) -> Result<Identity, ApiError> {
    identity.ok_or(ApiError::Unauthorized)
}

/// Sender or recipient only.
pub fn require_participant(identity: &Identity, message: &Message) -> Result<(), ApiError> {
    if identity.username == message.from_username() || identity.username == message.to_username() {
        return Ok(());
    }
    warn!("{} denied access to message {}", identity.username, message.id);
    Err(ApiError::Forbidden)
}

pub fn require_recipient(identity: &Identity, message: &Message) -> Result<(), ApiError> {
    if identity.username == message.to_username() {
        return Ok(());
    }
    warn!("{} is not the recipient of message {}", identity.username, message.id);
    Err(ApiError::Forbidden)
}

/// Per-user resources (profile, mailboxes) are visible to their owner only.
pub fn require_self(identity: &Identity, username: &str) -> Result<(), ApiError> {
    if identity.username == username {
        return Ok(());
    }
    warn!("{} denied access to resources of {}", identity.username, username);
    Err(ApiError::Forbidden)
}
