//! Error types for hestia-ddns
//!
//! This module defines all error types used throughout the workspace.

use thiserror::Error;

/// Result type alias for hestia-ddns operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for hestia-ddns
#[derive(Error, Debug)]
pub enum Error {
    /// Public IP discovery errors
    #[error("IP source error: {0}")]
    IpSource(String),

    /// Hosting panel inventory errors
    #[error("Inventory error: {0}")]
    Inventory(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Network-level failure talking to a provider (connect, reset, DNS)
    #[error("Network error ({provider}): {message}")]
    Network {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Request did not complete within the client timeout
    #[error("Timeout ({provider}): {message}")]
    Timeout {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Provider answered with a non-success HTTP status
    #[error("HTTP {status} from {provider}: {message}")]
    HttpStatus {
        /// Provider name
        provider: String,
        /// HTTP status code
        status: u16,
        /// Error message or response excerpt
        message: String,
    },

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Record or zone not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },
}

impl Error {
    /// Create an IP source error
    pub fn ip_source(msg: impl Into<String>) -> Self {
        Self::IpSource(msg.into())
    }

    /// Create an inventory error
    pub fn inventory(msg: impl Into<String>) -> Self {
        Self::Inventory(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a network error
    pub fn network(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Timeout {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(
        provider: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        Self::HttpStatus {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether a transport may retry the request that produced this error
    ///
    /// Network failures and timeouts are always retryable. HTTP status
    /// errors are retryable only if the status is listed in `statuses`.
    pub fn is_retryable(&self, statuses: &[u16]) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout { .. } => true,
            Self::HttpStatus { status, .. } => statuses.contains(status),
            _ => false,
        }
    }
}
