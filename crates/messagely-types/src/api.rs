use serde::{Deserialize, Serialize};

use crate::models::{Message, UserDetail, UserSummary};

// -- JWT Claims --

/// Session assertion carried by every bearer token. Shared by the issuer
/// and the auth middleware so both sides agree on the shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Username the token was issued to.
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Returned by both `/auth/register` and `/auth/login`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

// -- Messages --

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub to_username: String,
    pub body: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageEnvelope {
    pub message: Message,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessagesEnvelope<T> {
    pub messages: Vec<T>,
}

// -- Users --

#[derive(Debug, Serialize, Deserialize)]
pub struct UserEnvelope {
    pub user: UserDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UsersEnvelope {
    pub users: Vec<UserSummary>,
}
