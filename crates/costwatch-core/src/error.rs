//! Error types for Costwatch

use thiserror::Error;

/// Result type alias using Costwatch's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Costwatch operations
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed alert definition (bad threshold, missing target, duplicate id)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Webhook URL failed SSRF validation
    #[error("Security error: {0}")]
    Security(String),

    /// Notification transport failed
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// Persistence layer error
    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a security error
    pub fn security(msg: impl Into<String>) -> Self {
        Self::Security(msg.into())
    }

    /// Create a delivery error
    pub fn delivery(msg: impl Into<String>) -> Self {
        Self::Delivery(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
