//! Common error types for OpenGTM components.

use std::fmt;

/// A specialized Result type for OpenGTM operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for OpenGTM operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Health table error: {0}")]
    Table(String),

    #[error("Unknown pool: {0}")]
    UnknownPool(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown error: {0}")]
    Other(String),
}

impl Error {
    /// Create a new configuration error.
    pub fn config(msg: impl fmt::Display) -> Self {
        Error::Config(msg.to_string())
    }

    /// Create a new health table error.
    pub fn table(msg: impl fmt::Display) -> Self {
        Error::Table(msg.to_string())
    }

    /// Create a new other error.
    pub fn other(msg: impl fmt::Display) -> Self {
        Error::Other(msg.to_string())
    }
}
