//! Error types for presswatch.

use thiserror::Error;

/// Common error type for presswatch.
#[derive(Error, Debug)]
pub enum PresswatchError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// A unique resource already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Feed fetch or parse error.
    #[error("feed error: {0}")]
    Feed(String),

    /// Static artifact could not be updated.
    #[error("artifact error: {0}")]
    Artifact(String),

    /// Mail provider error.
    #[error("mail error: {0}")]
    Mail(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for PresswatchError {
    fn from(e: sqlx::Error) -> Self {
        PresswatchError::Database(e.to_string())
    }
}

/// Result type alias for presswatch operations.
pub type Result<T> = std::result::Result<T, PresswatchError>;
