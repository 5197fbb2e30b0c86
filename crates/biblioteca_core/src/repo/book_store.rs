//! Book storage contract and SQLite key-value implementation.
//!
//! # Responsibility
//! - Read the persisted registry blob as raw JSON records.
//! - Overwrite the blob with the full registry after every mutation.
//!
//! # Invariants
//! - Missing, non-text, non-UTF-8, unparsable or non-array blobs load as an
//!   empty sequence. Only SQLite failures are reported.
//! - `save` replaces the whole blob in one statement; there is no merge.

use crate::db::DbError;
use crate::model::book::Book;
use log::{debug, warn};
use rusqlite::types::{Type, ValueRef};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Fixed key under which the registry blob is stored.
pub const STORAGE_KEY: &str = "biblioteca_liceo_libros_v3";

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage failure. Data-shape problems are never reported here.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    Serialize(serde_json::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Serialize(err) => write!(f, "failed to serialize books: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialize(err) => Some(err),
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}

/// Persistence contract used by the registry.
pub trait BookStore {
    /// Returns the raw persisted records, or an empty sequence when the blob
    /// is absent or malformed.
    fn load(&self) -> StoreResult<Vec<Value>>;
    /// Overwrites the persisted blob with `books`.
    fn save(&self, books: &[Book]) -> StoreResult<()>;
}

/// Stored slot value before decoding.
enum StoredSlot {
    Text(Vec<u8>),
    NotText(Type),
}

/// SQLite-backed store keeping the registry as one row of `kv_store`.
pub struct SqliteBookStore<'conn> {
    conn: &'conn Connection,
    key: String,
}

impl<'conn> SqliteBookStore<'conn> {
    /// Binds the store to the default [`STORAGE_KEY`].
    pub fn new(conn: &'conn Connection) -> Self {
        Self::with_key(conn, STORAGE_KEY)
    }

    /// Binds the store to a custom key.
    pub fn with_key(conn: &'conn Connection, key: impl Into<String>) -> Self {
        Self {
            conn,
            key: key.into(),
        }
    }

    /// Reads the stored slot without decoding it.
    fn read_slot(&self) -> StoreResult<Option<StoredSlot>> {
        let slot = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1;",
                [self.key.as_str()],
                |row| {
                    Ok(match row.get_ref(0)? {
                        ValueRef::Text(bytes) => StoredSlot::Text(bytes.to_vec()),
                        other => StoredSlot::NotText(other.data_type()),
                    })
                },
            )
            .optional()?;
        Ok(slot)
    }

    /// Writes a raw blob verbatim. Used to seed storage state.
    pub fn write_blob(&self, blob: &str) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?1, ?2, strftime('%s', 'now') * 1000)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![self.key.as_str(), blob],
        )?;
        Ok(())
    }
}

impl BookStore for SqliteBookStore<'_> {
    fn load(&self) -> StoreResult<Vec<Value>> {
        let bytes = match self.read_slot()? {
            None => {
                debug!("event=store_load module=repo status=empty reason=absent");
                return Ok(Vec::new());
            }
            Some(StoredSlot::NotText(kind)) => {
                warn!("event=store_load module=repo status=empty reason=not_text type={kind}");
                return Ok(Vec::new());
            }
            Some(StoredSlot::Text(bytes)) => bytes,
        };
        let blob = match std::str::from_utf8(&bytes) {
            Ok(blob) => blob,
            Err(err) => {
                warn!("event=store_load module=repo status=empty reason=invalid_utf8 error={err}");
                return Ok(Vec::new());
            }
        };

        match serde_json::from_str::<Value>(blob) {
            Ok(Value::Array(records)) => {
                debug!(
                    "event=store_load module=repo status=ok records={}",
                    records.len()
                );
                Ok(records)
            }
            Ok(_) => {
                warn!("event=store_load module=repo status=empty reason=not_array");
                Ok(Vec::new())
            }
            Err(err) => {
                warn!(
                    "event=store_load module=repo status=empty reason=unparsable error={}",
                    err
                );
                Ok(Vec::new())
            }
        }
    }

    fn save(&self, books: &[Book]) -> StoreResult<()> {
        let blob = serde_json::to_string(books)?;
        self.write_blob(&blob)?;
        debug!(
            "event=store_save module=repo status=ok records={} bytes={}",
            books.len(),
            blob.len()
        );
        Ok(())
    }
}
