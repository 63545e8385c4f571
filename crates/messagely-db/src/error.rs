use rusqlite::{ErrorCode, ffi};
use thiserror::Error;
use tracing::warn;

/// Storage failures, classified at the database boundary so callers never
/// inspect SQLite error codes themselves.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A PRIMARY KEY or UNIQUE constraint rejected the write.
    #[error("record already exists")]
    Conflict,

    /// The target row is absent, or a FOREIGN KEY referenced a missing row.
    #[error("record not found")]
    NotFound,

    /// A stored value failed to decode into its column type.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("database lock poisoned")]
    LockPoisoned,

    #[error("sqlite error: {0}")]
    Sqlite(rusqlite::Error),
}

impl StoreError {
    /// Busy/locked database. Worth another attempt; nothing else is.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(err, _) = &e {
            if err.code == ErrorCode::ConstraintViolation {
                match err.extended_code {
                    ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE => {
                        return StoreError::Conflict;
                    }
                    ffi::SQLITE_CONSTRAINT_FOREIGNKEY => return StoreError::NotFound,
                    _ => {}
                }
            }
        }
        if let rusqlite::Error::FromSqlConversionFailure(column, _, err) = &e {
            warn!("Corrupt row (column {}): {}", column, err);
            return StoreError::Corrupt(format!("column {}: {}", column, err));
        }
        StoreError::Sqlite(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(code: std::ffi::c_int) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(ffi::Error::new(code), None)
    }

    #[test]
    fn constraint_codes_are_classified() {
        assert!(matches!(
            StoreError::from(failure(ffi::SQLITE_CONSTRAINT_UNIQUE)),
            StoreError::Conflict
        ));
        assert!(matches!(
            StoreError::from(failure(ffi::SQLITE_CONSTRAINT_PRIMARYKEY)),
            StoreError::Conflict
        ));
        assert!(matches!(
            StoreError::from(failure(ffi::SQLITE_CONSTRAINT_FOREIGNKEY)),
            StoreError::NotFound
        ));
        assert!(matches!(
            StoreError::from(failure(ffi::SQLITE_CONSTRAINT_NOTNULL)),
            StoreError::Sqlite(_)
        ));
    }

    #[test]
    fn undecodable_values_are_corrupt() {
        let bad = chrono::DateTime::parse_from_rfc3339("yesterday").unwrap_err();
        let err = StoreError::from(rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            Box::new(bad),
        ));
        assert!(matches!(&err, StoreError::Corrupt(msg) if msg.starts_with("column 3")));
        assert!(!err.is_transient());
    }

    #[test]
    fn only_busy_and_locked_are_transient() {
        assert!(StoreError::from(failure(ffi::SQLITE_BUSY)).is_transient());
        assert!(StoreError::from(failure(ffi::SQLITE_LOCKED)).is_transient());
        assert!(!StoreError::from(failure(ffi::SQLITE_CONSTRAINT_UNIQUE)).is_transient());
        assert!(!StoreError::NotFound.is_transient());
        assert!(!StoreError::from(rusqlite::Error::QueryReturnedNoRows).is_transient());
    }
}
