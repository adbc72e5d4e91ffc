//! Error types for session operations.

use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Session-specific errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Redis-specific error
    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] hashsession_redis::RedisError),

    /// The backing store rejected or failed a command
    #[error("Store error: {0}")]
    Store(String),

    /// The backing store could not be reached
    #[error("Connection error: {0}")]
    Connection(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A generated cookie could not be written as a header value
    #[error("Invalid header value: {0}")]
    InvalidHeader(String),
}

impl SessionError {
    /// Whether the error came from the backing store rather than from local
    /// encoding or configuration.
    pub fn is_store_error(&self) -> bool {
        match self {
            #[cfg(feature = "redis")]
            Self::Redis(_) => true,
            Self::Store(_) | Self::Connection(_) => true,
            _ => false,
        }
    }
}

impl From<http::header::InvalidHeaderValue> for SessionError {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}
