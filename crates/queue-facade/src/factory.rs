//! Building queues from configuration.

use crate::adapter::QueueAdapter;
use crate::adapters::{InMemoryAdapter, InMemoryConfig, NullAdapter};
use crate::config::QueueOptions;
use crate::error::{ConfigurationError, QueueError};
use crate::queue::Queue;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

#[cfg(test)]
#[path = "factory_tests.rs"]
mod tests;

/// Connection settings for an external storage driver
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverConfig {
    pub connection: String,
    #[serde(default)]
    pub options: BTreeMap<String, Value>,
}

/// Adapter selection, tagged by `kind`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AdapterConfig {
    Array(InMemoryConfig),
    Document(DriverConfig),
    Relational(DriverConfig),
    Null,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self::Array(InMemoryConfig::default())
    }
}

/// Everything needed to build one queue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueFactoryConfig {
    pub name: Option<String>,
    #[serde(default)]
    pub adapter: AdapterConfig,
    #[serde(default)]
    pub options: QueueOptions,
}

impl QueueFactoryConfig {
    /// Load a factory configuration from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigurationError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

/// Factory for creating queues with the appropriate adapter
pub struct QueueFactory;

impl QueueFactory {
    /// Create a queue from configuration and connect its adapter
    ///
    /// The queue itself is not created in the backend.
    pub async fn create(config: QueueFactoryConfig) -> Result<Queue, QueueError> {
        let name = match config.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => return Err(QueueError::invalid_argument("queue name is required")),
        };

        let adapter = Self::create_adapter(&config.adapter)?;
        adapter.connect().await?;

        info!(queue = name, adapter = adapter.name(), kind = %adapter.kind(), "Queue bound");
        Queue::with_options(name, adapter, config.options)
    }

    /// Load configuration from a file and create the queue it describes
    pub async fn from_file(path: &Path) -> Result<Queue, QueueError> {
        let config = QueueFactoryConfig::from_file(path)?;
        Self::create(config).await
    }

    /// Create an in-memory queue that already exists in its backend
    pub async fn create_test_queue(name: &str) -> Result<Queue, QueueError> {
        let queue = Queue::new(name, Arc::new(InMemoryAdapter::default()))?;
        queue.ensure_queue().await?;
        Ok(queue)
    }

    fn create_adapter(config: &AdapterConfig) -> Result<Arc<dyn QueueAdapter>, QueueError> {
        match config {
            AdapterConfig::Array(memory) => Ok(Arc::new(InMemoryAdapter::new(memory.clone())?)),
            AdapterConfig::Null => Ok(Arc::new(NullAdapter::new())),
            AdapterConfig::Document(_) => Err(ConfigurationError::UnsupportedAdapter {
                adapter: "document".to_string(),
                message: "no document store driver is available".to_string(),
            }
            .into()),
            AdapterConfig::Relational(_) => Err(ConfigurationError::UnsupportedAdapter {
                adapter: "relational".to_string(),
                message: "no relational driver is available".to_string(),
            }
            .into()),
        }
    }
}
