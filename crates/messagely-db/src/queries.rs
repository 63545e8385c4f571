use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};

use crate::models::{
    MessageRow, ParticipantRow, UserRow, format_timestamp, parse_optional_timestamp,
    parse_timestamp,
};
use crate::{Database, StoreError};

/// Message with both participants, joined in a single statement.
const MESSAGE_SELECT: &str = "
    SELECT m.id, m.body, m.sent_at, m.read_at,
           f.username, f.first_name, f.last_name, f.phone,
           t.username, t.first_name, t.last_name, t.phone
    FROM messages m
    JOIN users f ON f.username = m.from_username
    JOIN users t ON t.username = m.to_username";

const USER_COLUMNS: &str = "username, first_name, last_name, phone, join_at, last_login_at";

/// Fields supplied at registration.
pub struct NewUser<'a> {
    pub username: &'a str,
    pub password_hash: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub phone: &'a str,
}

impl Database {
    // -- Users --

    /// Insert a user whose `join_at` and `last_login_at` are both `now`.
    /// A taken username surfaces as `StoreError::Conflict` from the primary key.
    pub fn create_user(&self, user: &NewUser<'_>, now: DateTime<Utc>) -> Result<UserRow, StoreError> {
        let now = format_timestamp(now);
        self.with_conn_mut(|conn| {
            let row = conn.query_row(
                &format!(
                    "INSERT INTO users (username, password, first_name, last_name, phone, join_at, last_login_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                     RETURNING {USER_COLUMNS}"
                ),
                rusqlite::params![
                    user.username,
                    user.password_hash,
                    user.first_name,
                    user.last_name,
                    user.phone,
                    now,
                ],
                user_from_row,
            )?;
            Ok(row)
        })
    }

    pub fn get_password_hash(&self, username: &str) -> Result<Option<String>, StoreError> {
        self.with_conn(|conn| {
            let hash = conn
                .query_row(
                    "SELECT password FROM users WHERE username = ?1",
                    [username],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(hash)
        })
    }

    pub fn touch_last_login(&self, username: &str, now: DateTime<Utc>) -> Result<(), StoreError> {
        let now = format_timestamp(now);
        self.with_conn_mut(|conn| {
            let updated = conn.execute(
                "UPDATE users SET last_login_at = ?2 WHERE username = ?1",
                rusqlite::params![username, now],
            )?;
            if updated == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
    }

    pub fn get_user(&self, username: &str) -> Result<Option<UserRow>, StoreError> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
                    [username],
                    user_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY username ASC"))?;
            let rows = stmt
                .query_map([], user_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    // -- Messages --

    /// Insert a message and return it hydrated. Either username missing
    /// trips the foreign key and surfaces as `StoreError::NotFound`.
    pub fn insert_message(
        &self,
        from_username: &str,
        to_username: &str,
        body: &str,
        now: DateTime<Utc>,
    ) -> Result<MessageRow, StoreError> {
        let now = format_timestamp(now);
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO messages (from_username, to_username, body, sent_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![from_username, to_username, body, now],
            )?;
            let id = tx.last_insert_rowid();
            let row = query_message(&tx, id)?.ok_or(StoreError::NotFound)?;
            tx.commit()?;
            Ok(row)
        })
    }

    pub fn get_message(&self, id: i64) -> Result<Option<MessageRow>, StoreError> {
        self.with_conn(|conn| query_message(conn, id))
    }

    /// Outbox of `username`, oldest first.
    pub fn messages_from(&self, username: &str) -> Result<Vec<MessageRow>, StoreError> {
        self.with_conn(|conn| query_mailbox(conn, "m.from_username", username))
    }

    /// Inbox of `username`, oldest first.
    pub fn messages_to(&self, username: &str) -> Result<Vec<MessageRow>, StoreError> {
        self.with_conn(|conn| query_mailbox(conn, "m.to_username", username))
    }

    /// Stamp `read_at` if it is still unset and `reader` is the recipient,
    /// then return the row as stored. A message that was already read keeps
    /// its original timestamp, so concurrent duplicate calls converge.
    /// Returns `None` only when no message has this id.
    pub fn mark_read(
        &self,
        id: i64,
        reader: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<MessageRow>, StoreError> {
        let now = format_timestamp(now);
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "UPDATE messages SET read_at = MAX(?2, sent_at)
                 WHERE id = ?1 AND to_username = ?3 AND read_at IS NULL",
                rusqlite::params![id, now, reader],
            )?;
            let row = query_message(&tx, id)?;
            tx.commit()?;
            Ok(row)
        })
    }
}

fn query_message(conn: &Connection, id: i64) -> Result<Option<MessageRow>, StoreError> {
    let mut stmt = conn.prepare_cached(&format!("{MESSAGE_SELECT} WHERE m.id = ?1"))?;
    let row = stmt.query_row([id], message_from_row).optional()?;
    Ok(row)
}

fn query_mailbox(conn: &Connection, column: &str, username: &str) -> Result<Vec<MessageRow>, StoreError> {
    let mut stmt = conn.prepare_cached(&format!(
        "{MESSAGE_SELECT} WHERE {column} = ?1 ORDER BY m.sent_at ASC, m.id ASC"
    ))?;
    let rows = stmt
        .query_map([username], message_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        username: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        phone: row.get(3)?,
        join_at: parse_timestamp(4, &row.get::<_, String>(4)?)?,
        last_login_at: parse_optional_timestamp(5, row.get(5)?)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        body: row.get(1)?,
        sent_at: parse_timestamp(2, &row.get::<_, String>(2)?)?,
        read_at: parse_optional_timestamp(3, row.get(3)?)?,
        from: ParticipantRow {
            username: row.get(4)?,
            first_name: row.get(5)?,
            last_name: row.get(6)?,
            phone: row.get(7)?,
        },
        to: ParticipantRow {
            username: row.get(8)?,
            first_name: row.get(9)?,
            last_name: row.get(10)?,
            phone: row.get(11)?,
        },
    })
}
