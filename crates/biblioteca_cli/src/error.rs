//! Error types for the CLI.

use std::path::PathBuf;

use biblioteca_core::db::DbError;
use biblioteca_core::{LoggingError, RegistryError, TransferError};
use thiserror::Error;

/// CLI-specific result type.
pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("database error: {0}")]
    Database(#[from] DbError),

    #[error("{0}")]
    Registry(#[from] RegistryError),

    #[error("{0}")]
    Transfer(#[from] TransferError),

    #[error("logging error: {0}")]
    Logging(#[from] LoggingError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("book not found: {0}")]
    BookNotFound(String),

    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}
