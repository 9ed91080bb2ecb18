//! Error handling for Proplink core library

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Result type alias for Proplink operations
pub type Result<T> = std::result::Result<T, ProplinkError>;

/// Main error type for Proplink operations
#[derive(Error, Debug)]
pub enum ProplinkError {
    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// The service is not configured well enough to attempt the operation
    /// (for example a missing Listing Service credential). No request was sent.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The Listing Service answered with a non-success status
    #[error("Listing Service returned {status}: {body}")]
    Upstream { status: u16, body: String },

    /// The Listing Service answered 2xx with a body we could not interpret
    #[error("Malformed Listing Service response: {message}")]
    MalformedResponse { message: String },

    /// Network connectivity errors
    #[error("Network error: {message}")]
    Network { message: String },

    /// Timeout errors
    #[error("Operation timed out: {operation}")]
    Timeout { operation: String },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Resource not found errors
    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    /// Invalid state errors
    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    /// Failure of a fetch that was shared between concurrent callers
    #[error(transparent)]
    Coalesced(Arc<ProplinkError>),
}

impl ProplinkError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an upstream error from a status code and response body
    pub fn upstream<S: Into<String>>(status: u16, body: S) -> Self {
        Self::Upstream {
            status,
            body: body.into(),
        }
    }

    /// Create a malformed response error
    pub fn malformed<S: Into<String>>(message: S) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Create a network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(operation: S) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state<S: Into<String>>(message: S) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Recover an owned error from one that may have been shared between
    /// concurrent callers of the same fetch.
    pub fn from_shared(shared: Arc<ProplinkError>) -> Self {
        Arc::try_unwrap(shared).unwrap_or_else(Self::Coalesced)
    }

    /// Returns true when the error means the request never left this process
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::Configuration { .. } | Self::Config(_) => true,
            Self::Coalesced(inner) => inner.is_configuration(),
            _ => false,
        }
    }

    /// Returns true when the error is a "not found" condition
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Coalesced(inner) => inner.is_not_found(),
            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Http(_) | Self::Network { .. } => ErrorCategory::Network,
            Self::Json(_) => ErrorCategory::Serialization,
            Self::Config(_) | Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Url(_) => ErrorCategory::Url,
            Self::Upstream { .. } | Self::MalformedResponse { .. } => ErrorCategory::Upstream,
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::InvalidState { .. } => ErrorCategory::Internal,
            Self::Coalesced(inner) => inner.category(),
        }
    }
}

/// Error categories for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Network,
    Serialization,
    Configuration,
    Url,
    Upstream,
    Timeout,
    Validation,
    NotFound,
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::Serialization => write!(f, "serialization"),
            Self::Configuration => write!(f, "configuration"),
            Self::Url => write!(f, "url"),
            Self::Upstream => write!(f, "upstream"),
            Self::Timeout => write!(f, "timeout"),
            Self::Validation => write!(f, "validation"),
            Self::NotFound => write!(f, "not_found"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
