use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every non-secret field of a user. Returned by registration and by user
/// lookup; the password hash never leaves the database layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetail {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub join_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Listing entry for `GET /users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

/// A message participant expanded inline, so callers never need a second
/// lookup to render sender or recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

/// A directed message with both participants hydrated.
///
/// Only `read_at` changes after creation, and only from `None` to a
/// timestamp no earlier than `sent_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
    pub from_user: Participant,
    pub to_user: Participant,
}

impl Message {
    pub fn from_username(&self) -> &str {
        &self.from_user.username
    }

    pub fn to_username(&self) -> &str {
        &self.to_user.username
    }

    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}

/// Outbox view: the sender is implied by the mailbox being listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMessage {
    pub id: i64,
    pub to_user: Participant,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

impl From<Message> for SentMessage {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            to_user: m.to_user,
            body: m.body,
            sent_at: m.sent_at,
            read_at: m.read_at,
        }
    }
}

/// Inbox view: the recipient is implied by the mailbox being listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedMessage {
    pub id: i64,
    pub from_user: Participant,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

impl From<Message> for ReceivedMessage {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            from_user: m.from_user,
            body: m.body,
            sent_at: m.sent_at,
            read_at: m.read_at,
        }
    }
}
