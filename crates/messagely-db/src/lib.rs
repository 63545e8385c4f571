pub mod error;
pub mod migrations;
pub mod models;
pub mod queries;

use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{info, warn};

pub use error::StoreError;

const READER_POOL_SIZE: usize = 4;
const MAX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(25);
const BUSY_TIMEOUT: Duration = Duration::from_millis(250);

/// SQLite handle with a reader/writer split: one writer connection that
/// serialises every mutation, plus a small round-robin pool of read-only
/// connections for lookups.
pub struct Database {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    reader_idx: AtomicUsize,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let writer = Connection::open(path)?;

        // WAL mode for concurrent reads
        writer.pragma_update(None, "journal_mode", "WAL")?;
        writer.pragma_update(None, "foreign_keys", "ON")?;
        writer.busy_timeout(BUSY_TIMEOUT)?;

        migrations::run(&writer)?;

        let mut readers = Vec::with_capacity(READER_POOL_SIZE);
        for _ in 0..READER_POOL_SIZE {
            let conn = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            conn.busy_timeout(BUSY_TIMEOUT)?;
            readers.push(Mutex::new(conn));
        }

        info!(
            "Database opened at {} (1 writer + {} readers)",
            path.display(),
            READER_POOL_SIZE
        );
        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            reader_idx: AtomicUsize::new(0),
        })
    }

    /// Run a read-only closure on the next reader connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: Fn(&Connection) -> Result<T, StoreError>,
    {
        retry_transient(|| {
            let idx = self.reader_idx.fetch_add(1, Ordering::Relaxed) % self.readers.len();
            let conn = self.readers[idx]
                .lock()
                .map_err(|_| StoreError::LockPoisoned)?;
            f(&conn)
        })
    }

    /// Run a closure on the writer connection. Each call is expected to be
    /// one logical transaction; the lock is released before any retry.
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: Fn(&Connection) -> Result<T, StoreError>,
    {
        retry_transient(|| {
            let conn = self.writer.lock().map_err(|_| StoreError::LockPoisoned)?;
            f(&conn)
        })
    }
}

fn retry_transient<T>(mut op: impl FnMut() -> Result<T, StoreError>) -> Result<T, StoreError> {
    let mut attempt = 1;
    loop {
        match op() {
            Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                warn!("Transient database error (attempt {}/{}): {}", attempt, MAX_ATTEMPTS, e);
                std::thread::sleep(RETRY_BACKOFF * attempt);
                attempt += 1;
            }
            result => return result,
        }
    }
}
