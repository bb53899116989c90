// Error types for the help desk search engine
// Every failure is recovered at the engine boundary; these only travel between internals

use thiserror::Error;

/// Errors raised by corpus loading and persisted state
#[derive(Error, Debug)]
pub enum KbError {
    /// File system failure (corpus file, file-backed store)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed corpus or stored JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Remote corpus fetch failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Key-value store rejected an operation
    #[error("Storage error: {0}")]
    Storage(String),

    /// Caller passed something unusable (bridge only)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl KbError {
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        KbError::Storage(msg.into())
    }

    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        KbError::InvalidInput(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, KbError>;
