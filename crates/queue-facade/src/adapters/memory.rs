//! In-memory queue adapter implementation for testing and development.
//!
//! This module provides the "array" backend:
//! - Insertion-ordered storage per queue
//! - Receives go through the shared claim protocol
//! - Scheduled delivery and repeating re-arm
//! - Optional release of stale claims after a timeout
//!
//! The storage lock is the adapter's atomic primitive: every
//! `find_and_claim` runs under a single write lock.

use crate::adapter::{
    AdapterKind, CountMessagesCapable, DeleteMessageCapable, ListQueuesCapable, QueueAdapter,
    QueueDescriptor,
};
use crate::claim::{self, ClaimRequest, ClaimStore, StoredMessage};
use crate::error::{ConfigurationError, QueueError};
use crate::message::{ClaimHandle, Envelope, MessageId, QueueName, Timestamp};
use crate::params::{ReceiveParameters, SendParameters, CLASS_FILTER, REPEATING_INTERVAL, SCHEDULE};
use async_trait::async_trait;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

const ADAPTER_NAME: &str = "memory";

/// In-memory adapter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InMemoryConfig {
    /// Maximum number of stored messages per queue
    pub max_queue_size: usize,
    /// Seconds after which an unfinished claim is released; `None` never releases
    pub claim_timeout_secs: Option<u64>,
}

impl Default for InMemoryConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 10000,
            claim_timeout_secs: None,
        }
    }
}

impl InMemoryConfig {
    /// Check the configuration and resolve the claim timeout
    pub fn claim_timeout(&self) -> Result<Option<Duration>, ConfigurationError> {
        let Some(secs) = self.claim_timeout_secs else {
            return Ok(None);
        };

        i64::try_from(secs)
            .ok()
            .and_then(Duration::try_seconds)
            .map(Some)
            .ok_or_else(|| ConfigurationError::Invalid {
                message: format!("claim_timeout_secs {} is out of range", secs),
            })
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_queue_size == 0 {
            return Err(ConfigurationError::Invalid {
                message: "max_queue_size must be at least 1".to_string(),
            });
        }

        self.claim_timeout().map(|_| ())
    }
}

// ============================================================================
// Internal Storage Structures
// ============================================================================

/// Thread-safe storage for all queues
struct QueueStorage {
    queues: HashMap<QueueName, InMemoryQueue>,
}

/// Internal state for a single queue
struct InMemoryQueue {
    id: String,
    /// Oldest first
    messages: Vec<MemoryRecord>,
}

impl InMemoryQueue {
    fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            messages: Vec::new(),
        }
    }

    fn find_mut(&mut self, id: &MessageId) -> Option<&mut MemoryRecord> {
        self.messages.iter_mut().find(|r| &r.message.id == id)
    }
}

/// A stored message plus its repeat schedule
#[derive(Clone)]
struct MemoryRecord {
    message: StoredMessage,
    repeat_every: Option<Duration>,
}

// ============================================================================
// InMemoryAdapter
// ============================================================================

/// In-memory queue adapter
#[derive(Clone)]
pub struct InMemoryAdapter {
    storage: Arc<RwLock<QueueStorage>>,
    config: InMemoryConfig,
    claim_timeout: Option<Duration>,
}

impl InMemoryAdapter {
    /// Create new in-memory adapter with configuration
    pub fn new(config: InMemoryConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let claim_timeout = config.claim_timeout()?;

        Ok(Self {
            storage: Arc::new(RwLock::new(QueueStorage {
                queues: HashMap::new(),
            })),
            config,
            claim_timeout,
        })
    }

    /// Configuration the adapter was built with
    pub fn config(&self) -> &InMemoryConfig {
        &self.config
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, QueueStorage>, QueueError> {
        self.storage
            .read()
            .map_err(|_| QueueError::backend(ADAPTER_NAME, "storage lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, QueueStorage>, QueueError> {
        self.storage
            .write()
            .map_err(|_| QueueError::backend(ADAPTER_NAME, "storage lock poisoned"))
    }
}

impl Default for InMemoryAdapter {
    fn default() -> Self {
        Self {
            storage: Arc::new(RwLock::new(QueueStorage {
                queues: HashMap::new(),
            })),
            config: InMemoryConfig::default(),
            claim_timeout: None,
        }
    }
}

fn not_found(name: &QueueName) -> QueueError {
    QueueError::QueueNotFound {
        queue_name: name.to_string(),
    }
}

#[async_trait]
impl QueueAdapter for InMemoryAdapter {
    fn name(&self) -> &str {
        ADAPTER_NAME
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Array
    }

    async fn connect(&self) -> Result<(), QueueError> {
        Ok(())
    }

    async fn queue_exists(&self, name: &QueueName) -> Result<bool, QueueError> {
        Ok(self.read()?.queues.contains_key(name))
    }

    async fn create_queue(&self, name: &QueueName) -> Result<bool, QueueError> {
        let mut storage = self.write()?;
        if storage.queues.contains_key(name) {
            return Ok(false);
        }

        storage.queues.insert(name.clone(), InMemoryQueue::new());
        info!(queue = %name, "Created in-memory queue");
        Ok(true)
    }

    async fn delete_queue(&self, name: &QueueName) -> Result<bool, QueueError> {
        let removed = self.write()?.queues.remove(name);
        if let Some(queue) = &removed {
            info!(queue = %name, dropped = queue.messages.len(), "Deleted in-memory queue");
        }
        Ok(removed.is_some())
    }

    async fn queue_id(&self, name: &QueueName) -> Result<Option<String>, QueueError> {
        Ok(self.read()?.queues.get(name).map(|q| q.id.clone()))
    }

    async fn send_message(
        &self,
        queue: &QueueDescriptor,
        mut envelope: Envelope,
        params: &SendParameters,
    ) -> Result<Envelope, QueueError> {
        let now = Timestamp::now();
        let available_at = params.schedule().unwrap_or(now);
        let repeat_every = params
            .repeating_interval()
            .filter(|interval| *interval > Duration::zero());

        let record = MemoryRecord {
            message: StoredMessage::new(&envelope, params.as_options().clone(), available_at),
            repeat_every,
        };
        let message_id = record.message.id.clone();

        let queue_id = {
            let mut storage = self.write()?;
            let stored = storage
                .queues
                .get_mut(&queue.name)
                .ok_or_else(|| not_found(&queue.name))?;

            if stored.messages.len() >= self.config.max_queue_size {
                return Err(QueueError::backend(
                    ADAPTER_NAME,
                    format!(
                        "queue '{}' is full ({} messages)",
                        queue.name, self.config.max_queue_size
                    ),
                ));
            }

            stored.messages.push(record);
            stored.id.clone()
        };

        debug!(queue = %queue.name, message_id = %message_id, "Stored message");

        envelope.set_delivery(queue.delivery_record(
            ADAPTER_NAME,
            None,
            message_id,
            Some(queue_id),
            params.as_options().clone(),
        ));
        Ok(envelope)
    }

    async fn receive_messages(
        &self,
        queue: &QueueDescriptor,
        max_messages: u32,
        params: &ReceiveParameters,
    ) -> Result<Vec<Envelope>, QueueError> {
        let queue_id = self
            .queue_id(&queue.name)
            .await?
            .ok_or_else(|| not_found(&queue.name))?;

        claim::claim_messages(self, ADAPTER_NAME, queue, Some(queue_id), max_messages, params)
            .await
    }

    fn available_send_params(&self) -> &[&'static str] {
        &[SCHEDULE, REPEATING_INTERVAL]
    }

    fn available_receive_params(&self) -> &[&'static str] {
        &[CLASS_FILTER]
    }

    fn as_delete_message(&self) -> Option<&dyn DeleteMessageCapable> {
        Some(self)
    }

    fn as_count_messages(&self) -> Option<&dyn CountMessagesCapable> {
        Some(self)
    }

    fn as_list_queues(&self) -> Option<&dyn ListQueuesCapable> {
        Some(self)
    }
}

#[async_trait]
impl ClaimStore for InMemoryAdapter {
    fn claim_timeout(&self) -> Option<Duration> {
        self.claim_timeout
    }

    async fn candidates(
        &self,
        queue: &QueueName,
        class_filter: Option<&str>,
        limit: usize,
        now: Timestamp,
    ) -> Result<Vec<MessageId>, QueueError> {
        let release_after = self.claim_timeout();
        let storage = self.read()?;
        let stored = storage.queues.get(queue).ok_or_else(|| not_found(queue))?;

        Ok(stored
            .messages
            .iter()
            .filter(|r| r.message.is_claimable(now, release_after))
            .filter(|r| r.message.matches_class(class_filter))
            .take(limit)
            .map(|r| r.message.id.clone())
            .collect())
    }

    async fn find_and_claim(
        &self,
        queue: &QueueName,
        request: &ClaimRequest,
    ) -> Result<Option<StoredMessage>, QueueError> {
        let release_after = self.claim_timeout();
        let mut storage = self.write()?;
        let stored = storage
            .queues
            .get_mut(queue)
            .ok_or_else(|| not_found(queue))?;

        let Some(record) = stored.find_mut(&request.id) else {
            return Ok(None);
        };

        let previous = record.message.clone();
        if previous.is_claimable(request.now, release_after) {
            // Repeating messages stay unclaimed and move to their next slot
            let next_slot = record
                .repeat_every
                .and_then(|every| request.now.checked_plus(every));

            match next_slot {
                Some(next) => record.message.available_at = next,
                None => {
                    if record.repeat_every.take().is_some() {
                        warn!(
                            queue = %queue,
                            message_id = %request.id,
                            "Next repeat is out of range; delivering one last time"
                        );
                    }
                    record.message.handle = Some(request.handle.clone());
                    record.message.claimed_at = Some(request.now);
                }
            }
        }

        Ok(Some(previous))
    }

    async fn delete_if_handle(
        &self,
        queue: &QueueName,
        id: &MessageId,
        handle: Option<&ClaimHandle>,
    ) -> Result<bool, QueueError> {
        let mut storage = self.write()?;
        let stored = storage
            .queues
            .get_mut(queue)
            .ok_or_else(|| not_found(queue))?;

        let position = stored
            .messages
            .iter()
            .position(|r| &r.message.id == id && r.message.handle.as_ref() == handle);

        match position {
            Some(index) => {
                stored.messages.remove(index);
                debug!(queue = %queue, message_id = %id, "Deleted message");
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl DeleteMessageCapable for InMemoryAdapter {
    async fn delete_message(
        &self,
        queue: &QueueDescriptor,
        envelope: &Envelope,
    ) -> Result<bool, QueueError> {
        claim::delete_claimed(self, queue, envelope).await
    }
}

#[async_trait]
impl CountMessagesCapable for InMemoryAdapter {
    async fn count_messages(&self, queue: &QueueDescriptor) -> Result<u64, QueueError> {
        let storage = self.read()?;
        let stored = storage
            .queues
            .get(&queue.name)
            .ok_or_else(|| not_found(&queue.name))?;

        Ok(stored
            .messages
            .iter()
            .filter(|r| r.message.handle.is_none())
            .count() as u64)
    }
}

#[async_trait]
impl ListQueuesCapable for InMemoryAdapter {
    async fn list_queues(&self) -> Result<Vec<QueueName>, QueueError> {
        let mut names: Vec<QueueName> = self.read()?.queues.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
