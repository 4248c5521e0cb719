//! Error types for FactBot

/// Result type alias using FactBot's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for FactBot operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The completion backend did not answer before the deadline
    #[error("operation timed out")]
    Timeout,

    /// Non-timeout failure reported by the completion backend
    #[error("remote error: {0}")]
    Remote(String),

    /// The backend answered with a leading tag outside the stage vocabulary
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Admission rejected because a context reset is draining or reloading
    #[error("reset in progress")]
    ResetInProgress,

    /// Chat gateway action failed (reply or delete)
    #[error("gateway error: {0}")]
    Gateway(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a new remote backend error
    pub fn remote(msg: impl Into<String>) -> Self {
        Self::Remote(msg.into())
    }

    /// Create a new malformed response error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// Create a new gateway error
    pub fn gateway(msg: impl Into<String>) -> Self {
        Self::Gateway(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error means the caller should retry later
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::ResetInProgress)
    }
}
