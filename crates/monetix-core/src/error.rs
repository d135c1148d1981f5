//! Error types shared by the client, the bulk runner and the session cache.

use thiserror::Error;

/// Monetix error type
///
/// Upstream rejections keep the status code and the raw body text so callers
/// can surface exactly what the Open Cloud API answered.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MonetixError {
    /// Non-2xx response from the upstream API
    #[error("Roblox API {status}: {body}")]
    Upstream { status: u16, body: String },

    /// The request never produced a response (DNS, TLS, connect, ...)
    #[error("Request failed: {0}")]
    Transport(String),

    /// Input rejected before any network call
    #[error("{0}")]
    Validation(String),

    /// Storage/database error
    #[error("Storage error: {0}")]
    StorageError(String),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),
}

impl MonetixError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Upstream status code, if this error carries one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, MonetixError>;

impl From<reqwest::Error> for MonetixError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::SerializationError(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for MonetixError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for MonetixError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

impl From<sled::Error> for MonetixError {
    fn from(err: sled::Error) -> Self {
        Self::StorageError(err.to_string())
    }
}
