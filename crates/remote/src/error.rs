//! Error types for the remote saved-items client.

use thiserror::Error;

/// Result type alias for remote client operations.
pub type Result<T> = std::result::Result<T, RemoteError>;

/// Errors that can occur while talking to the saved-items backend.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API error response from the backend
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Invalid request (missing required data, etc.)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl RemoteError {
    /// Create an API error from status and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// HTTP status if this is an API error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<RemoteError> for studyshelf_core::Error {
    fn from(error: RemoteError) -> Self {
        match &error {
            RemoteError::Api { status, message } => match *status {
                404 => studyshelf_core::Error::OwnerNotFound(message.clone()),
                408 | 429 | 500..=599 => studyshelf_core::Error::Transport(message.clone()),
                _ => studyshelf_core::Error::Validation(message.clone()),
            },
            // Connect failures, timeouts, dropped bodies: all retryable.
            RemoteError::Http(e) => studyshelf_core::Error::Transport(e.to_string()),
            RemoteError::Json(e) => studyshelf_core::Error::Validation(e.to_string()),
            RemoteError::InvalidRequest(message) => {
                studyshelf_core::Error::Validation(message.clone())
            }
        }
    }
}
