//! Error types for queue operations.

use thiserror::Error;

/// Boxed error type produced by a backend driver
pub type BackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Comprehensive error type for all queue operations
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Queue not found: {queue_name}")]
    QueueNotFound { queue_name: String },

    #[error("Unsupported operation: {capability}")]
    UnsupportedOperation { capability: String },

    #[error("Backend error ({adapter}): {source}")]
    Backend {
        adapter: String,
        #[source]
        source: BackendError,
    },

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl QueueError {
    /// Build an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Build an unsupported operation error naming the missing capability
    pub fn unsupported(capability: impl std::fmt::Display) -> Self {
        Self::UnsupportedOperation {
            capability: capability.to_string(),
        }
    }

    /// Wrap a backend driver failure without discarding it
    pub fn backend<E>(adapter: impl Into<String>, source: E) -> Self
    where
        E: Into<BackendError>,
    {
        Self::Backend {
            adapter: adapter.into(),
            source: source.into(),
        }
    }

    /// Check if error is transient and a caller-driven retry may succeed
    ///
    /// Nothing in this crate retries on its own.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::InvalidArgument { .. } => false,
            Self::QueueNotFound { .. } => false,
            Self::UnsupportedOperation { .. } => false,
            Self::Backend { .. } => true,
            Self::Serialization(_) => false,
            Self::Configuration(_) => false,
            Self::Validation(_) => false,
        }
    }

    /// Check if this is an unsupported operation error
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedOperation { .. })
    }

    /// Check if this is an invalid argument or validation error
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. } | Self::Validation(_))
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Configuration parsing failed: {message}")]
    Parsing { message: String },

    #[error("Unsupported adapter '{adapter}': {message}")]
    UnsupportedAdapter { adapter: String, message: String },
}

impl From<config::ConfigError> for ConfigurationError {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound(key) => Self::Missing { key },
            other => Self::Parsing {
                message: other.to_string(),
            },
        }
    }
}

/// Validation errors
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    Required { field: String },

    #[error("Invalid format for {field}: {message}")]
    InvalidFormat { field: String, message: String },

    #[error("Value out of range for {field}: {message}")]
    OutOfRange { field: String, message: String },
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
