use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use messagely_db::{Database, StoreError};
use messagely_types::models::Message;

use crate::error::ApiError;
use crate::guard::{self, Identity};

/// Owns message records and the one-way unread -> read transition.
/// Every message it returns has both participants hydrated.
pub struct MessageStore {
    db: Arc<Database>,
}

impl MessageStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn create(&self, from_username: &str, to_username: &str, body: &str) -> Result<Message, ApiError> {
        let row = self
            .db
            .insert_message(from_username, to_username, body, Utc::now())
            .map_err(|e| match e {
                StoreError::NotFound => ApiError::NotFound(format!(
                    "No such user: {} or {}",
                    from_username, to_username
                )),
                other => other.into(),
            })?;

        info!("Message {} sent from {} to {}", row.id, from_username, to_username);
        Ok(row.into())
    }

    pub fn get(&self, id: i64) -> Result<Message, ApiError> {
        self.db
            .get_message(id)?
            .map(Into::into)
            .ok_or_else(|| no_such_message(id))
    }

    /// Outbox of `username`, oldest first. Empty when nothing was sent.
    pub fn list_sent_by(&self, username: &str) -> Result<Vec<Message>, ApiError> {
        Ok(self.db.messages_from(username)?.into_iter().map(Into::into).collect())
    }

    /// Inbox of `username`, oldest first. Empty when nothing was received.
    pub fn list_received_by(&self, username: &str) -> Result<Vec<Message>, ApiError> {
        Ok(self.db.messages_to(username)?.into_iter().map(Into::into).collect())
    }

    /// Recipient-only. Marking an already-read message returns it unchanged.
    pub fn mark_read(&self, id: i64, acting: &Identity) -> Result<Message, ApiError> {
        let message = self.get(id)?;
        guard::require_recipient(acting, &message)?;

        if message.is_read() {
            debug!("Message {} already read", id);
            return Ok(message);
        }

        let row = self
            .db
            .mark_read(id, &acting.username, Utc::now())?
            .ok_or_else(|| no_such_message(id))?;

        info!("Message {} read by {}", id, acting.username);
        Ok(row.into())
    }
}

fn no_such_message(id: i64) -> ApiError {
    ApiError::NotFound(format!("No such message: {}", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use messagely_db::queries::NewUser;
    use tempfile::TempDir;

    fn store() -> (TempDir, MessageStore) {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(Database::open(&dir.path().join("test.db")).unwrap());
        for (username, first) in [("alice", "Alice"), ("bob", "Bob"), ("carol", "Carol")] {
            db.create_user(
                &NewUser {
                    username,
                    password_hash: "unused",
                    first_name: first,
                    last_name: "Smith",
                    phone: "+14155550000",
                },
                Utc::now(),
            )
            .unwrap();
        }
        (dir, MessageStore::new(db))
    }

    fn bodies(messages: Vec<Message>) -> Vec<String> {
        messages.into_iter().map(|m| m.body).collect()
    }

    #[test]
    fn created_message_is_unread_and_hydrated() {
        let (_dir, store) = store();
        let created = store.create("alice", "bob", "hi").unwrap();
        let fetched = store.get(created.id).unwrap();

        assert_eq!(fetched, created);
        assert!(fetched.read_at.is_none());
        assert!(fetched.sent_at <= Utc::now());
        assert_eq!(fetched.from_user.first_name, "Alice");
        assert_eq!(fetched.to_user.first_name, "Bob");
    }

    #[test]
    fn create_with_unknown_participant_is_not_found() {
        let (_dir, store) = store();
        assert!(matches!(store.create("alice", "ghost", "hi"), Err(ApiError::NotFound(_))));
        assert!(matches!(store.create("ghost", "alice", "hi"), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn get_unknown_id_is_not_found() {
        let (_dir, store) = store();
        assert!(matches!(store.get(404), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn mailboxes_split_sent_and_received() {
        let (_dir, store) = store();
        store.create("alice", "bob", "u1-to-u2").unwrap();
        store.create("bob", "alice", "u2-to-u1").unwrap();

        assert_eq!(bodies(store.list_sent_by("alice").unwrap()), ["u1-to-u2"]);
        assert_eq!(bodies(store.list_received_by("alice").unwrap()), ["u2-to-u1"]);
        assert!(store.list_sent_by("carol").unwrap().is_empty());
    }

    #[test]
    fn sent_listing_only_contains_own_messages_in_order() {
        let (_dir, store) = store();
        store.create("alice", "bob", "one").unwrap();
        store.create("carol", "bob", "noise").unwrap();
        store.create("alice", "carol", "two").unwrap();

        let sent = store.list_sent_by("alice").unwrap();
        assert!(sent.iter().all(|m| m.from_username() == "alice"));
        assert!(sent.windows(2).all(|w| w[0].sent_at <= w[1].sent_at));
        assert_eq!(bodies(sent), ["one", "two"]);

        let received = store.list_received_by("bob").unwrap();
        assert!(received.iter().all(|m| m.to_username() == "bob"));
        assert_eq!(bodies(received), ["one", "noise"]);
    }

    #[test]
    fn recipient_marks_read_once() {
        let (_dir, store) = store();
        let msg = store.create("alice", "bob", "hi").unwrap();
        let bob = Identity::new("bob");

        let read = store.mark_read(msg.id, &bob).unwrap();
        let read_at = read.read_at.expect("read_at set");
        assert!(read_at >= read.sent_at);

        let again = store.mark_read(msg.id, &bob).unwrap();
        assert_eq!(again.read_at, Some(read_at));
        assert_eq!(store.get(msg.id).unwrap().read_at, Some(read_at));
    }

    #[test]
    fn non_recipient_cannot_mark_read() {
        let (_dir, store) = store();
        let msg = store.create("alice", "bob", "hi").unwrap();

        for who in ["alice", "carol"] {
            let err = store.mark_read(msg.id, &Identity::new(who)).unwrap_err();
            assert!(matches!(err, ApiError::Forbidden));
        }
        assert!(store.get(msg.id).unwrap().read_at.is_none());
    }

    #[test]
    fn mark_read_unknown_id_is_not_found() {
        let (_dir, store) = store();
        assert!(matches!(
            store.mark_read(99, &Identity::new("bob")),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn concurrent_mark_read_converges() {
        let (_dir, store) = store();
        let store = Arc::new(store);
        let msg = store.create("alice", "bob", "hi").unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || store.mark_read(msg.id, &Identity::new("bob")))
            })
            .collect();
        let read_ats: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap().read_at)
            .collect();

        let stored = store.get(msg.id).unwrap().read_at;
        assert!(stored.is_some());
        assert!(read_ats.iter().all(|r| *r == stored));
    }
}
