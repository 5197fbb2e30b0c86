//! Core domain logic for the Biblioteca library inventory.
//! This crate is the single source of truth for book and loan invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;
pub mod transfer;

pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::book::{
    parse_due_date, Book, BookDraft, BookId, BookStatus, BookValidationError, HistoryEntry,
    HistoryItem, LoanEventKind, LoanRequest,
};
pub use model::sanitize::{sanitize_book, sanitize_books};
pub use repo::book_store::{BookStore, SqliteBookStore, StoreError, StoreResult, STORAGE_KEY};
pub use search::filter::{filter_books, BookQuery, StatusFilter, UnknownStatusFilter};
pub use service::registry::{BookRegistry, RegistryChange, RegistryError, RegistryResult};
pub use transfer::{
    export_csv, export_json, parse_import, TransferError, TransferResult, CSV_EXPORT_FILE_NAME,
    JSON_EXPORT_FILE_NAME,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
