//! SQLite-backed object store.
//!
//! Objects are stored as JSON bodies in a single `objects` table keyed by
//! id. Every fetched row is converted back through the checked constructors,
//! so a row whose body was altered surfaces as
//! [`ObjectError::InvalidObject`](crate::errors::ObjectError::InvalidObject).

pub mod schema;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use super::ObjectStore;
use crate::errors::{ObjectError, StoreError};
use crate::objects::{Object, ObjectRecord};

/// Object store wrapping a SQLite connection.
///
/// The connection is opened in WAL mode. It sits behind a `Mutex` so the
/// store is `Send + Sync` and can be shared inside an `Arc` for reads.
pub struct SqliteObjectStore {
    conn: Mutex<Connection>,
}

impl SqliteObjectStore {
    /// Open (or create) a SQLite database at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        info!(path = %path.display(), "opening object store");

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;

        debug!("object store opened with WAL mode");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open `path` and bring its schema up to date.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let store = Self::new(path)?;
        store.initialize()?;
        Ok(store)
    }

    /// Run all schema migrations to bring the database up to date.
    pub fn initialize(&self) -> Result<(), StoreError> {
        let conn = self.conn();
        schema::run_migrations(&conn)?;
        debug!("object store schema is up to date");
        Ok(())
    }

    /// Obtain a lock on the underlying connection.
    ///
    /// If the Mutex is poisoned (a previous holder panicked), the lock is
    /// recovered rather than propagating a panic.
    pub fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("object store mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Number of stored rows, labels included.
    pub fn len(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM objects", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

impl ObjectStore for SqliteObjectStore {
    fn exists(&self, id: &str) -> Result<bool, StoreError> {
        let found: Option<i64> = self
            .conn()
            .query_row("SELECT 1 FROM objects WHERE id = ?1", params![id], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    fn fetch(&self, id: &str) -> Result<Option<Object>, StoreError> {
        let body: Option<String> = self
            .conn()
            .query_row("SELECT body FROM objects WHERE id = ?1", params![id], |row| row.get(0))
            .optional()?;
        let Some(body) = body else {
            return Ok(None);
        };

        let record: ObjectRecord = serde_json::from_str(&body)?;
        let object = Object::try_from(record)?;
        if object.object_id() != id {
            return Err(ObjectError::InvalidObject {
                object_type: object.object_type().to_string(),
                expected: id.to_string(),
                actual: object.object_id().to_string(),
            }
            .into());
        }
        debug!(id, object_type = %object.object_type(), "fetched object");
        Ok(Some(object))
    }

    fn store(&mut self, id: &str, object: &Object) -> Result<(), StoreError> {
        let body = serde_json::to_string(&ObjectRecord::from(object))?;
        let now = Utc::now().to_rfc3339();
        self.conn().execute(
            "INSERT INTO objects (id, object_type, body, stored_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                object_type = excluded.object_type,
                body = excluded.body,
                stored_at = excluded.stored_at",
            params![id, object.object_type().as_str(), body, now],
        )?;
        debug!(id, object_type = %object.object_type(), "stored object");
        Ok(())
    }
}
