//! Storage error types.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors raised by the SQLite cache layer.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database query error: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Cache payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

impl From<StorageError> for studyshelf_core::Error {
    fn from(error: StorageError) -> Self {
        studyshelf_core::Error::Storage(error.to_string())
    }
}
