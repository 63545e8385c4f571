use std::sync::Arc;

use anyhow::anyhow;
use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::SaltString,
};
use chrono::Utc;
use rand_core::OsRng;
use tracing::info;

use messagely_db::queries::NewUser;
use messagely_db::{Database, StoreError};
use messagely_types::api::RegisterRequest;
use messagely_types::models::{UserDetail, UserSummary};

use crate::error::ApiError;

/// Owns user records and everything that touches a password.
pub struct CredentialStore {
    db: Arc<Database>,
    hasher: Argon2<'static>,
    /// Verified against when the username is unknown, so a miss costs the
    /// same as a wrong password.
    dummy_hash: String,
}

impl CredentialStore {
    pub fn new(db: Arc<Database>, params: Params) -> Result<Self, ApiError> {
        let hasher = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let dummy_hash = hash_password(&hasher, "messagely-dummy-password")?;
        Ok(Self { db, hasher, dummy_hash })
    }

    /// Create a user with a salted Argon2id hash of `password`.
    /// Returns every field except the hash.
    pub fn register(&self, req: &RegisterRequest) -> Result<UserDetail, ApiError> {
        let password_hash = hash_password(&self.hasher, &req.password)?;

        let row = self
            .db
            .create_user(
                &NewUser {
                    username: &req.username,
                    password_hash: &password_hash,
                    first_name: &req.first_name,
                    last_name: &req.last_name,
                    phone: &req.phone,
                },
                Utc::now(),
            )
            .map_err(|e| match e {
                StoreError::Conflict => {
                    ApiError::Conflict(format!("Username already exists: {}", req.username))
                }
                other => other.into(),
            })?;

        info!("Registered user {}", row.username);
        Ok(row.into())
    }

    /// Unknown usernames are a plain `false`, never an error.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<bool, ApiError> {
        match self.db.get_password_hash(username)? {
            Some(stored) => self.verify(password, &stored),
            None => {
                self.verify(password, &self.dummy_hash)?;
                Ok(false)
            }
        }
    }

    pub fn record_login(&self, username: &str) -> Result<(), ApiError> {
        self.db
            .touch_last_login(username, Utc::now())
            .map_err(|e| not_found_user(e, username))
    }

    pub fn get(&self, username: &str) -> Result<UserDetail, ApiError> {
        self.db
            .get_user(username)?
            .map(Into::into)
            .ok_or_else(|| ApiError::NotFound(format!("No such user: {}", username)))
    }

    /// All users, ordered by username.
    pub fn list_all(&self) -> Result<Vec<UserSummary>, ApiError> {
        Ok(self.db.list_users()?.into_iter().map(Into::into).collect())
    }

    fn verify(&self, password: &str, stored: &str) -> Result<bool, ApiError> {
        let parsed = PasswordHash::new(stored)
            .map_err(|e| ApiError::Internal(anyhow!("corrupt password hash: {}", e)))?;
        Ok(self.hasher.verify_password(password.as_bytes(), &parsed).is_ok())
    }
}

fn hash_password(hasher: &Argon2<'_>, password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    hasher
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(anyhow!("password hashing failed: {}", e)))
}

fn not_found_user(e: StoreError, username: &str) -> ApiError {
    match e {
        StoreError::NotFound => ApiError::NotFound(format!("No such user: {}", username)),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, CredentialStore) {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(Database::open(&dir.path().join("test.db")).unwrap());
        let params = Params::new(Params::MIN_M_COST, 1, 1, None).unwrap();
        (dir, CredentialStore::new(db, params).unwrap())
    }

    fn registration(username: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.into(),
            password: password.into(),
            first_name: "Test".into(),
            last_name: "Testy".into(),
            phone: "+14155550000".into(),
        }
    }

    #[test]
    fn register_returns_public_fields() {
        let (_dir, store) = store();
        let user = store.register(&registration("alice", "password")).unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.phone, "+14155550000");
        assert_eq!(user.last_login_at, Some(user.join_at));
    }

    #[test]
    fn stored_hash_is_not_the_password() {
        let (_dir, store) = store();
        store.register(&registration("alice", "password")).unwrap();
        let stored = store.db.get_password_hash("alice").unwrap().unwrap();
        assert_ne!(stored, "password");
        assert!(stored.starts_with("$argon2id$"));
    }

    #[test]
    fn authenticate_accepts_only_the_registered_password() {
        let (_dir, store) = store();
        store.register(&registration("alice", "password")).unwrap();
        assert!(store.authenticate("alice", "password").unwrap());
        assert!(!store.authenticate("alice", "Password").unwrap());
        assert!(!store.authenticate("alice", "").unwrap());
    }

    #[test]
    fn authenticate_unknown_user_is_false() {
        let (_dir, store) = store();
        assert!(!store.authenticate("ghost", "password").unwrap());
        // The dummy hash's own password does not log anyone in either.
        assert!(!store.authenticate("ghost", "messagely-dummy-password").unwrap());
    }

    #[test]
    fn duplicate_registration_conflicts() {
        let (_dir, store) = store();
        store.register(&registration("alice", "password")).unwrap();
        let err = store.register(&registration("alice", "different")).unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        // The original credentials still work.
        assert!(store.authenticate("alice", "password").unwrap());
    }

    #[test]
    fn concurrent_duplicate_registration_has_one_winner() {
        let (_dir, store) = store();
        let store = Arc::new(store);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || store.register(&registration("alice", "password")))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .filter_map(|r| r.as_ref().err())
                .all(|e| matches!(e, ApiError::Conflict(_)))
        );
    }

    #[test]
    fn record_login_moves_last_login_forward() {
        let (_dir, store) = store();
        let user = store.register(&registration("alice", "password")).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        store.record_login("alice").unwrap();
        let after = store.get("alice").unwrap();
        assert!(after.last_login_at.unwrap() > user.join_at);
        assert_eq!(after.join_at, user.join_at);
    }

    #[test]
    fn missing_user_is_not_found() {
        let (_dir, store) = store();
        assert!(matches!(store.get("ghost"), Err(ApiError::NotFound(_))));
        assert!(matches!(store.record_login("ghost"), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn list_all_is_sorted_summaries() {
        let (_dir, store) = store();
        store.register(&registration("bob", "password")).unwrap();
        store.register(&registration("alice", "password")).unwrap();
        let users = store.list_all().unwrap();
        let names: Vec<_> = users.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, ["alice", "bob"]);
        assert_eq!(users[0].first_name, "Test");
    }
}
