//! Common error types for SiteCanvas.

use thiserror::Error;

/// Top-level error type for SiteCanvas operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A `set_path` call matched none of the path grammar forms.
    ///
    /// Resolved locally by the document layer; the document is left
    /// unchanged.
    #[error("Unaddressable path: {0}")]
    UnaddressablePath(String),

    /// Network or endpoint unreachable. Retryable.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Endpoint reachable but it signalled failure. Handled identically to
    /// a transport error by the retry logic.
    #[error("Save rejected by endpoint: {0}")]
    RejectedSave(String),

    /// Terminal for the current change cycle; only a new document change or
    /// a manual save attempts again.
    #[error("Retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    /// Bootstrap document missing or malformed. Blocks session start.
    #[error("Load failure: {0}")]
    LoadFailure(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Engine or session task is no longer running.
    #[error("Channel error: {0}")]
    Channel(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the save pipeline may retry after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::RejectedSave(_))
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
