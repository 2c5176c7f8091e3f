//! Adapter contract implemented by every storage backend.
//!
//! Required operations live on [`QueueAdapter`]. Optional operations live on
//! their own capability traits; an adapter opts into one by implementing the
//! trait and overriding the matching `as_*` accessor. The facade only ever
//! asks the accessor, never the concrete adapter type.

use crate::config::QueueOptions;
use crate::error::QueueError;
use crate::events::EventPublisher;
use crate::message::{ClaimHandle, DeliveryRecord, Envelope, MessageId, QueueName};
use crate::params::{OptionMap, ReceiveParameters, SendParameters};
use crate::poller::StopToken;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Family a backend belongs to
///
/// Informational only: the facade never branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdapterKind {
    Array,
    Document,
    Relational,
    Null,
    Custom,
}

impl std::fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Array => "array",
            Self::Document => "document",
            Self::Relational => "relational",
            Self::Null => "null",
            Self::Custom => "custom",
        };
        write!(f, "{}", name)
    }
}

/// What an adapter needs to know about the queue it is serving
#[derive(Debug, Clone, PartialEq)]
pub struct QueueDescriptor {
    pub name: QueueName,
    pub options: QueueOptions,
}

impl QueueDescriptor {
    /// Create a descriptor
    pub fn new(name: QueueName, options: QueueOptions) -> Self {
        Self { name, options }
    }

    /// Build the delivery record for a message of this queue
    pub fn delivery_record(
        &self,
        adapter: &str,
        handle: Option<ClaimHandle>,
        message_id: MessageId,
        queue_id: Option<String>,
        options: OptionMap,
    ) -> DeliveryRecord {
        DeliveryRecord {
            handle,
            message_id,
            queue_id,
            queue_name: self.name.clone(),
            adapter: adapter.to_string(),
            options,
        }
    }
}

/// Operations every backend must provide
#[async_trait]
pub trait QueueAdapter: Send + Sync {
    /// Adapter name recorded in delivery records
    fn name(&self) -> &str;

    /// Backend family
    fn kind(&self) -> AdapterKind;

    /// Ensure the backend connection is usable
    async fn connect(&self) -> Result<(), QueueError>;

    /// Check whether a queue exists in the backend
    async fn queue_exists(&self, name: &QueueName) -> Result<bool, QueueError>;

    /// Create a queue; `false` when it already existed
    async fn create_queue(&self, name: &QueueName) -> Result<bool, QueueError>;

    /// Delete a queue and all of its messages; `false` when it did not exist
    async fn delete_queue(&self, name: &QueueName) -> Result<bool, QueueError>;

    /// Backend identifier of a queue, if it exists
    async fn queue_id(&self, name: &QueueName) -> Result<Option<String>, QueueError>;

    /// Store a message and return it with a send-time delivery record
    async fn send_message(
        &self,
        queue: &QueueDescriptor,
        envelope: Envelope,
        params: &SendParameters,
    ) -> Result<Envelope, QueueError>;

    /// Claim and return up to `max_messages` messages
    ///
    /// `max_messages` has already been validated as non-zero.
    async fn receive_messages(
        &self,
        queue: &QueueDescriptor,
        max_messages: u32,
        params: &ReceiveParameters,
    ) -> Result<Vec<Envelope>, QueueError>;

    /// Send parameter names this adapter understands
    fn available_send_params(&self) -> &[&'static str] {
        &[]
    }

    /// Receive parameter names this adapter understands
    fn available_receive_params(&self) -> &[&'static str] {
        &[]
    }

    /// Delete support; `None` unless the adapter overrides it
    fn as_delete_message(&self) -> Option<&dyn DeleteMessageCapable> {
        None
    }

    /// Message counting support
    fn as_count_messages(&self) -> Option<&dyn CountMessagesCapable> {
        None
    }

    /// Queue listing support
    fn as_list_queues(&self) -> Option<&dyn ListQueuesCapable> {
        None
    }

    /// Native await support; without it the facade polls
    fn as_await_messages(&self) -> Option<&dyn AwaitMessagesCapable> {
        None
    }
}

/// Delete a previously received (or sent) message
#[async_trait]
pub trait DeleteMessageCapable: Send + Sync {
    /// Remove the message described by the envelope's delivery record
    ///
    /// Returns `false` when the record's handle no longer matches the
    /// backend's current claim.
    async fn delete_message(
        &self,
        queue: &QueueDescriptor,
        envelope: &Envelope,
    ) -> Result<bool, QueueError>;
}

/// Count messages waiting in a queue
#[async_trait]
pub trait CountMessagesCapable: Send + Sync {
    /// Approximate number of unclaimed messages
    async fn count_messages(&self, queue: &QueueDescriptor) -> Result<u64, QueueError>;
}

/// Enumerate queues known to the backend
#[async_trait]
pub trait ListQueuesCapable: Send + Sync {
    async fn list_queues(&self) -> Result<Vec<QueueName>, QueueError>;
}

/// Native blocking wait
#[async_trait]
pub trait AwaitMessagesCapable: Send + Sync {
    /// Block until `stop` is cancelled, publishing receive and idle events
    async fn await_messages(
        &self,
        queue: &QueueDescriptor,
        publisher: &dyn EventPublisher,
        params: &ReceiveParameters,
        stop: &StopToken,
    ) -> Result<(), QueueError>;
}

#[cfg(test)]
#[path = "adapter_tests.rs"]
mod tests;
