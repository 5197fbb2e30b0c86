//! SQLite file holding the library's key-value slot.
//!
//! The whole registry lives in one `kv_store` row keyed by
//! [`crate::STORAGE_KEY`]; this module only owns the file and its schema.
//!
//! # Responsibility
//! - Open the database file (or an in-memory database for tests) with a
//!   busy timeout so concurrent CLI invocations wait instead of failing.
//! - Create the `kv_store` table through `PRAGMA user_version` migrations.
//!
//! # Invariants
//! - `open_db*` never returns a connection whose schema is behind
//!   [`migrations::latest_version`].
//! - A database written by a newer build is refused rather than downgraded.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "library database schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
