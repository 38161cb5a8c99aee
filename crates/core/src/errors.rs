//! Error types shared across the saved-items core.

use thiserror::Error;

/// Result type alias for saved-items operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by saved-items services.
///
/// Nothing here is process-fatal: every failure path either leaves the
/// caller in a usable local-only state or in a cleanly rolled-back state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// The account does not exist server-side (yet, or anymore).
    #[error("owner not found: {0}")]
    OwnerNotFound(String),

    /// Network/server unreachable, timed out, or responded 5xx.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The request itself was malformed; retrying the same call cannot help.
    #[error("validation failure: {0}")]
    Validation(String),

    /// Local persistence error. The cache layer swallows these; they only
    /// surface when a repository is used directly.
    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    pub fn owner_not_found(message: impl Into<String>) -> Self {
        Self::OwnerNotFound(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Whether retrying the identical call later can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Storage(_))
    }
}
