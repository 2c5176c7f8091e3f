//! Queue configuration.

use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default metadata slot holding the delivery record
pub const DEFAULT_METADATA_KEY: &str = "__queue";

/// Default message class label stamped on outgoing envelopes
pub const DEFAULT_MESSAGE_CLASS: &str = "envelope";

/// Per-queue configuration
///
/// Treated as immutable once a queue has been constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueOptions {
    /// Class label stamped on envelopes that do not carry one
    pub message_class: String,

    /// Reserved metadata key under which the delivery record is exposed
    pub metadata_key: String,

    /// Emulate blocking await by polling when the adapter has no native support
    pub enable_await_emulation: bool,

    /// Pause between idle polling iterations, in milliseconds
    pub idle_backoff_ms: u64,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            message_class: DEFAULT_MESSAGE_CLASS.to_string(),
            metadata_key: DEFAULT_METADATA_KEY.to_string(),
            enable_await_emulation: true,
            idle_backoff_ms: 250,
        }
    }
}

impl QueueOptions {
    /// Load options from an optional file overlaid with `QUEUE_*` environment variables
    ///
    /// Keys missing from every source fall back to [`QueueOptions::default`].
    pub fn from_sources(path: Option<&Path>) -> Result<Self, ConfigurationError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(config::Environment::with_prefix("QUEUE"));

        let options: Self = builder.build()?.try_deserialize()?;
        options.validate()?;
        Ok(options)
    }

    /// Disable await emulation
    pub fn without_await_emulation(mut self) -> Self {
        self.enable_await_emulation = false;
        self
    }

    /// Set the idle backoff
    ///
    /// Backoffs longer than `u64::MAX` milliseconds saturate.
    pub fn with_idle_backoff(mut self, backoff: Duration) -> Self {
        self.idle_backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the reserved metadata key
    pub fn with_metadata_key(mut self, key: impl Into<String>) -> Self {
        self.metadata_key = key.into();
        self
    }

    /// Set the default message class
    pub fn with_message_class(mut self, class: impl Into<String>) -> Self {
        self.message_class = class.into();
        self
    }

    /// Pause between idle polling iterations
    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }

    /// Check the options are usable
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.metadata_key.is_empty() {
            return Err(ConfigurationError::Invalid {
                message: "metadata_key must not be empty".to_string(),
            });
        }

        if self.message_class.is_empty() {
            return Err(ConfigurationError::Invalid {
                message: "message_class must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
