//! The queue facade.
//!
//! A [`Queue`] binds a validated name and [`QueueOptions`] to one adapter and
//! exposes every operation through a single API. Optional operations are
//! resolved through the adapter's capability accessors and fail with
//! [`QueueError::UnsupportedOperation`] when the adapter does not provide
//! them.

use crate::adapter::{QueueAdapter, QueueDescriptor};
use crate::capability::{self, Capability};
use crate::config::QueueOptions;
use crate::error::QueueError;
use crate::events::EventDispatcher;
use crate::message::{Envelope, Metadata, QueueName, Timestamp};
use crate::params::{
    ensure_supported, strip_schedule, ReceiveParameters, SendParameters,
    MAX_REPEATING_INTERVAL_SECS, REPEATING_INTERVAL, SCHEDULE,
};
use crate::poller::{AwaitPoller, StopToken};
use bytes::Bytes;
use chrono::Duration;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;

/// Messages requested per receive when the caller does not say
pub const DEFAULT_MAX_MESSAGES: u32 = 1;

/// Serialisable snapshot of a queue's binding
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueDebugInfo {
    pub name: String,
    pub adapter: String,
    pub adapter_kind: String,
    pub options: QueueOptions,
    pub capabilities: Vec<Capability>,
    pub send_params: Vec<String>,
    pub receive_params: Vec<String>,
    pub await_emulation: bool,
}

/// A named queue bound to one adapter
///
/// Clones share the adapter and the event dispatcher.
///
/// # Examples
///
/// ```
/// use queue_facade::{InMemoryAdapter, Queue};
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let queue = Queue::new("orders", Arc::new(InMemoryAdapter::default())).unwrap();
/// queue.ensure_queue().await.unwrap();
///
/// queue.send("order #1", None).await.unwrap();
/// let received = queue.receive(Some(10), None).await.unwrap();
/// assert_eq!(received[0].content_str(), Some("order #1"));
///
/// assert!(queue.delete_message(&received[0]).await.unwrap());
/// # });
/// ```
#[derive(Clone)]
pub struct Queue {
    descriptor: QueueDescriptor,
    adapter: Arc<dyn QueueAdapter>,
    events: Arc<EventDispatcher>,
}

impl Queue {
    /// Bind `name` to `adapter` with default options
    pub fn new(name: &str, adapter: Arc<dyn QueueAdapter>) -> Result<Self, QueueError> {
        Self::with_options(name, adapter, QueueOptions::default())
    }

    /// Bind `name` to `adapter` with explicit options
    ///
    /// The backend is not touched; call [`Queue::ensure_queue`] to create it.
    pub fn with_options(
        name: &str,
        adapter: Arc<dyn QueueAdapter>,
        options: QueueOptions,
    ) -> Result<Self, QueueError> {
        if name.is_empty() {
            return Err(QueueError::invalid_argument("queue name must not be empty"));
        }

        let name = QueueName::new(name.to_string())?;
        options.validate()?;

        Ok(Self {
            descriptor: QueueDescriptor::new(name, options),
            adapter,
            events: Arc::new(EventDispatcher::new()),
        })
    }

    /// Validated queue name
    pub fn name(&self) -> &QueueName {
        &self.descriptor.name
    }

    /// Options fixed at construction
    pub fn options(&self) -> &QueueOptions {
        &self.descriptor.options
    }

    /// The bound adapter
    pub fn adapter(&self) -> &Arc<dyn QueueAdapter> {
        &self.adapter
    }

    /// Listener registry for await notifications
    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    // ------------------------------------------------------------------
    // Capability predicates
    // ------------------------------------------------------------------

    /// Check whether the bound adapter provides `capability`
    pub fn supports(&self, capability: Capability) -> bool {
        capability::supports(self.adapter.as_ref(), capability)
    }

    /// True when [`Queue::delete_message`] is available
    pub fn can_delete_message(&self) -> bool {
        self.supports(Capability::DeleteMessage)
    }

    /// True when [`Queue::count`] is available
    pub fn can_count_messages(&self) -> bool {
        self.supports(Capability::CountMessages)
    }

    /// True when [`Queue::list_queues`] is available
    pub fn can_list_queues(&self) -> bool {
        self.supports(Capability::ListQueues)
    }

    /// True when the adapter accepts the `schedule` send parameter
    pub fn can_schedule(&self) -> bool {
        self.supports(Capability::Schedule)
    }

    /// True when await works either natively or through emulation
    pub fn can_await(&self) -> bool {
        self.supports(Capability::AwaitMessages) || self.options().enable_await_emulation
    }

    /// True when await would fall back to polling
    pub fn is_await_emulation(&self) -> bool {
        !self.supports(Capability::AwaitMessages) && self.options().enable_await_emulation
    }

    /// Check whether the adapter declares send parameter `name`
    pub fn is_send_param_supported(&self, name: &str) -> bool {
        self.adapter.available_send_params().contains(&name)
    }

    /// Check whether the adapter declares receive parameter `name`
    pub fn is_receive_param_supported(&self, name: &str) -> bool {
        self.adapter.available_receive_params().contains(&name)
    }

    // ------------------------------------------------------------------
    // Queue management
    // ------------------------------------------------------------------

    /// Create the queue in the backend if it does not exist
    ///
    /// Returns `true` when the queue was created by this call.
    pub async fn ensure_queue(&self) -> Result<bool, QueueError> {
        if self.adapter.queue_exists(self.name()).await? {
            return Ok(false);
        }

        let created = self.adapter.create_queue(self.name()).await?;
        if created {
            info!(queue = %self.name(), adapter = self.adapter.name(), "Queue created");
        }
        Ok(created)
    }

    /// Check whether the queue exists in the backend
    pub async fn exists(&self) -> Result<bool, QueueError> {
        self.adapter.queue_exists(self.name()).await
    }

    /// Delete the queue and every message in it
    pub async fn delete_queue(&self) -> Result<bool, QueueError> {
        let deleted = self.adapter.delete_queue(self.name()).await?;
        if deleted {
            info!(queue = %self.name(), adapter = self.adapter.name(), "Queue deleted");
        }
        Ok(deleted)
    }

    /// Backend identifier of the queue, if it exists
    pub async fn queue_id(&self) -> Result<Option<String>, QueueError> {
        self.adapter.queue_id(self.name()).await
    }

    // ------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------

    /// Send a message
    ///
    /// A delivery record left over from an earlier send or receive is
    /// dropped first, as is any application metadata under the reserved
    /// [`QueueOptions::metadata_key`]. Envelopes without a class get the
    /// queue's default.
    pub async fn send(
        &self,
        message: impl Into<Envelope>,
        params: Option<SendParameters>,
    ) -> Result<Envelope, QueueError> {
        let params = params.unwrap_or_default();
        ensure_supported("send", params.names(), self.adapter.available_send_params())?;
        params.validate()?;

        let mut envelope = message.into();
        if envelope.take_delivery().is_some() {
            debug!(queue = %self.name(), "Dropped stale delivery record before send");
        }
        if envelope.metadata.remove(&self.options().metadata_key).is_some() {
            debug!(
                queue = %self.name(),
                key = %self.options().metadata_key,
                "Dropped metadata entry under the reserved key"
            );
        }
        if envelope.class.is_none() {
            envelope.class = Some(self.options().message_class.clone());
        }

        let sent = self
            .adapter
            .send_message(&self.descriptor, envelope, &params)
            .await?;

        debug!(
            queue = %self.name(),
            adapter = self.adapter.name(),
            message_id = ?sent.delivery().map(|r| r.message_id.as_str()),
            "Message sent"
        );
        Ok(sent)
    }

    /// Receive up to `max_messages` messages (default 1)
    ///
    /// Each returned envelope is claimed for this caller only.
    pub async fn receive(
        &self,
        max_messages: Option<u32>,
        params: Option<ReceiveParameters>,
    ) -> Result<Vec<Envelope>, QueueError> {
        let max_messages = max_messages.unwrap_or(DEFAULT_MAX_MESSAGES);
        if max_messages == 0 {
            return Err(QueueError::invalid_argument(
                "max_messages must be at least 1",
            ));
        }

        let params = params.unwrap_or_default();
        ensure_supported(
            "receive",
            params.names(),
            self.adapter.available_receive_params(),
        )?;

        let received = self
            .adapter
            .receive_messages(&self.descriptor, max_messages, &params)
            .await?;

        debug!(
            queue = %self.name(),
            requested = max_messages,
            received = received.len(),
            "Messages received"
        );
        Ok(received)
    }

    /// Delete a received message
    ///
    /// Returns `false` when the envelope's claim is no longer current.
    pub async fn delete_message(&self, envelope: &Envelope) -> Result<bool, QueueError> {
        let adapter = self
            .adapter
            .as_delete_message()
            .ok_or_else(|| QueueError::unsupported(Capability::DeleteMessage))?;

        let deleted = adapter.delete_message(&self.descriptor, envelope).await?;
        if !deleted {
            warn!(queue = %self.name(), "Delete refused: handle is stale or message is gone");
        }
        Ok(deleted)
    }

    /// Flat metadata for `envelope`, with its delivery record under the reserved key
    pub fn message_metadata(&self, envelope: &Envelope) -> Result<Metadata, QueueError> {
        envelope.metadata_with_delivery(&self.options().metadata_key)
    }

    /// Rebuild an envelope from flat metadata written by [`Queue::message_metadata`]
    pub fn envelope_from_metadata(
        &self,
        content: impl Into<Bytes>,
        metadata: Metadata,
    ) -> Result<Envelope, QueueError> {
        Envelope::from_metadata(content, metadata, &self.options().metadata_key)
    }

    /// Number of unclaimed messages
    pub async fn count(&self) -> Result<u64, QueueError> {
        let adapter = self
            .adapter
            .as_count_messages()
            .ok_or_else(|| QueueError::unsupported(Capability::CountMessages))?;

        adapter.count_messages(&self.descriptor).await
    }

    /// Every queue known to the bound adapter
    pub async fn list_queues(&self) -> Result<Vec<QueueName>, QueueError> {
        let adapter = self
            .adapter
            .as_list_queues()
            .ok_or_else(|| QueueError::unsupported(Capability::ListQueues))?;

        adapter.list_queues().await
    }

    // ------------------------------------------------------------------
    // Scheduling
    // ------------------------------------------------------------------

    /// Send a message that becomes receivable at `when`, optionally every `repeat`
    ///
    /// Nothing is sent when the adapter cannot honour the request or when
    /// `repeat` is outside 1 second to [`MAX_REPEATING_INTERVAL_SECS`].
    pub async fn schedule(
        &self,
        message: impl Into<Envelope>,
        when: Timestamp,
        repeat: Option<Duration>,
    ) -> Result<Envelope, QueueError> {
        if !self.is_send_param_supported(SCHEDULE) {
            return Err(QueueError::unsupported(Capability::Schedule));
        }

        let mut params = SendParameters::new().with_schedule(when);
        if let Some(interval) = repeat {
            if !self.is_send_param_supported(REPEATING_INTERVAL) {
                return Err(QueueError::invalid_argument(
                    "adapter does not support repeating schedules",
                ));
            }
            if interval < Duration::seconds(1)
                || interval.num_seconds() > MAX_REPEATING_INTERVAL_SECS
            {
                return Err(QueueError::invalid_argument(format!(
                    "repeating interval must be 1 to {} seconds",
                    MAX_REPEATING_INTERVAL_SECS
                )));
            }
            params.set_repeating_interval(interval);
        }

        self.send(message, Some(params)).await
    }

    /// Cancel a scheduled message
    ///
    /// Deletes the message. When the delete succeeds the schedule keys are
    /// removed from the envelope's delivery record; otherwise the envelope
    /// is left untouched. Returns the delete result.
    pub async fn unschedule(&self, envelope: &mut Envelope) -> Result<bool, QueueError> {
        if !self.is_send_param_supported(SCHEDULE) {
            return Err(QueueError::unsupported(Capability::Schedule));
        }

        let adapter = self
            .adapter
            .as_delete_message()
            .ok_or_else(|| QueueError::unsupported(Capability::DeleteMessage))?;

        let mut record = envelope.delivery().cloned().ok_or_else(|| {
            QueueError::unsupported("unschedule requires a delivery record")
        })?;
        strip_schedule(&mut record.options);

        let mut unscheduled = envelope.clone();
        unscheduled.set_delivery(record);

        let deleted = adapter.delete_message(&self.descriptor, &unscheduled).await?;
        if deleted {
            *envelope = unscheduled;
        }
        debug!(queue = %self.name(), deleted, "Message unscheduled");
        Ok(deleted)
    }

    // ------------------------------------------------------------------
    // Await
    // ------------------------------------------------------------------

    /// Wait for messages until a listener calls [`QueueEvent::stop_await`]
    ///
    /// [`QueueEvent::stop_await`]: crate::events::QueueEvent::stop_await
    pub async fn await_messages(&self, params: Option<ReceiveParameters>) -> Result<(), QueueError> {
        self.await_until(params, StopToken::new()).await
    }

    /// Wait for messages until `stop` is cancelled
    ///
    /// Delegates to the adapter's native await when available, otherwise
    /// polls with [`AwaitPoller`] unless emulation is disabled.
    pub async fn await_until(
        &self,
        params: Option<ReceiveParameters>,
        stop: StopToken,
    ) -> Result<(), QueueError> {
        let params = params.unwrap_or_default();
        ensure_supported(
            "receive",
            params.names(),
            self.adapter.available_receive_params(),
        )?;

        if let Some(native) = self.adapter.as_await_messages() {
            debug!(queue = %self.name(), "Delegating await to adapter");
            return native
                .await_messages(&self.descriptor, self.events.as_ref(), &params, &stop)
                .await;
        }

        if !self.options().enable_await_emulation {
            return Err(QueueError::unsupported(Capability::AwaitMessages));
        }

        let adapter = self.adapter.as_ref();
        let descriptor = &self.descriptor;
        let params = &params;
        let mut poller = AwaitPoller::new(self.options().idle_backoff(), stop);

        poller
            .run(self.name(), self.events.as_ref(), move || {
                adapter.receive_messages(descriptor, DEFAULT_MAX_MESSAGES, params)
            })
            .await
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    /// Snapshot of the binding for logs and diagnostics
    pub fn debug_info(&self) -> QueueDebugInfo {
        QueueDebugInfo {
            name: self.name().to_string(),
            adapter: self.adapter.name().to_string(),
            adapter_kind: self.adapter.kind().to_string(),
            options: self.options().clone(),
            capabilities: capability::capabilities(self.adapter.as_ref()),
            send_params: self
                .adapter
                .available_send_params()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            receive_params: self
                .adapter
                .available_receive_params()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            await_emulation: self.is_await_emulation(),
        }
    }
}

impl std::fmt::Debug for Queue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue")
            .field("name", self.name())
            .field("adapter", &self.adapter.name())
            .field("options", self.options())
            .field("events", &self.events)
            .finish()
    }
}
