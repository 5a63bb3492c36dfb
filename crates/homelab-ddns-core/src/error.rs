//! Error types for the homelab DDNS updater
//!
//! Every collaborator call returns [`Result`]; the reconciler inspects the
//! error and decides whether the iteration degrades, fails, or stops.

use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the homelab DDNS updater
#[derive(Error, Debug)]
pub enum Error {
    /// IP discovery errors
    #[error("IP source error: {0}")]
    IpSource(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors (transport, client construction)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Non-success HTTP status reported by a remote API
    #[error("{provider} returned HTTP {status}: {message}")]
    Status {
        /// Provider or service name
        provider: String,
        /// Numeric HTTP status
        status: u16,
        /// Human readable description
        message: String,
    },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The operation was aborted by the cancellation token
    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    /// Create an IP source error
    pub fn ip_source(msg: impl Into<String>) -> Self {
        Self::IpSource(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create a status error
    pub fn status(provider: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether this error was caused by cancellation rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// HTTP status attached to this error, if any
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
