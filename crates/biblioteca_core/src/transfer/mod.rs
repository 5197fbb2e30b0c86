//! Import/export of registry snapshots.
//!
//! # Responsibility
//! - Produce JSON and CSV snapshots of the full, unfiltered registry.
//! - Parse and sanitize JSON imports.
//!
//! # Invariants
//! - Exported JSON re-imports into records equal to the originals.
//! - Rejected imports never touch the registry.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod csv_export;
mod json;

pub use csv_export::{export_csv, CSV_HEADER};
pub use json::{export_json, parse_import};

/// Suggested file name for JSON exports.
pub const JSON_EXPORT_FILE_NAME: &str = "biblioteca.json";
/// Suggested file name for CSV exports.
pub const CSV_EXPORT_FILE_NAME: &str = "biblioteca.csv";

pub type TransferResult<T> = Result<T, TransferError>;

/// Import/export failure.
#[derive(Debug)]
pub enum TransferError {
    /// Import text is not valid JSON.
    Parse(serde_json::Error),
    /// Import root is valid JSON but not an array.
    NotAnArray,
    Serialize(serde_json::Error),
    Csv(csv::Error),
}

impl Display for TransferError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "import is not valid JSON: {err}"),
            Self::NotAnArray => write!(f, "import must be a JSON array of books"),
            Self::Serialize(err) => write!(f, "failed to serialize export: {err}"),
            Self::Csv(err) => write!(f, "failed to write CSV export: {err}"),
        }
    }
}

impl Error for TransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) | Self::Serialize(err) => Some(err),
            Self::NotAnArray => None,
            Self::Csv(err) => Some(err),
        }
    }
}

impl From<csv::Error> for TransferError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}
