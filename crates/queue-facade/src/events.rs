//! Queue notifications raised while awaiting messages.

use crate::message::{Envelope, QueueName};
use crate::poller::StopToken;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Kind of notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A receive returned at least one message
    Receive,
    /// A receive returned nothing
    Idle,
}

/// Notification published by the await loop
#[derive(Debug, Clone)]
pub struct QueueEvent {
    kind: EventKind,
    queue: QueueName,
    messages: Vec<Envelope>,
    stop: StopToken,
}

impl QueueEvent {
    pub fn new(kind: EventKind, queue: QueueName, messages: Vec<Envelope>, stop: StopToken) -> Self {
        Self {
            kind,
            queue,
            messages,
            stop,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn queue_name(&self) -> &QueueName {
        &self.queue
    }

    /// Messages received in this iteration; empty for idle events
    pub fn messages(&self) -> &[Envelope] {
        &self.messages
    }

    /// Ask the await loop to stop after this notification
    pub fn stop_await(&self) {
        self.stop.cancel();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop.is_cancelled()
    }
}

/// Receives queue notifications
#[cfg_attr(test, mockall::automock)]
pub trait QueueEventListener: Send + Sync {
    fn on_event(&self, event: &QueueEvent);
}

/// Adapts a closure into a listener
pub struct FnListener<F>(pub F);

impl<F> QueueEventListener for FnListener<F>
where
    F: Fn(&QueueEvent) + Send + Sync,
{
    fn on_event(&self, event: &QueueEvent) {
        (self.0)(event)
    }
}

/// Anything that can deliver a notification to listeners
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: &QueueEvent);
}

/// Token returned by [`EventDispatcher::attach`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Registration {
    id: ListenerId,
    kind: EventKind,
    listener: Arc<dyn QueueEventListener>,
}

/// Listener registry keyed by event kind
///
/// Listeners are invoked in attach order. The registry lock is released
/// before any listener runs, so listeners may attach or detach freely.
#[derive(Default)]
pub struct EventDispatcher {
    registrations: RwLock<Vec<Registration>>,
    next_id: AtomicU64,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for one event kind
    pub fn attach(&self, kind: EventKind, listener: Arc<dyn QueueEventListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.registrations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Registration { id, kind, listener });
        id
    }

    /// Register a closure for one event kind
    pub fn attach_fn<F>(&self, kind: EventKind, f: F) -> ListenerId
    where
        F: Fn(&QueueEvent) + Send + Sync + 'static,
    {
        self.attach(kind, Arc::new(FnListener(f)))
    }

    /// Remove a listener; `false` if it was not registered
    pub fn detach(&self, id: ListenerId) -> bool {
        let mut registrations = self
            .registrations
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = registrations.len();
        registrations.retain(|r| r.id != id);
        registrations.len() < before
    }

    /// Number of listeners attached for `kind`
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.registrations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.kind == kind)
            .count()
    }
}

impl EventPublisher for EventDispatcher {
    fn publish(&self, event: &QueueEvent) {
        let listeners: Vec<Arc<dyn QueueEventListener>> = self
            .registrations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.kind == event.kind())
            .map(|r| Arc::clone(&r.listener))
            .collect();

        for listener in listeners {
            listener.on_event(event);
        }
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("receive_listeners", &self.listener_count(EventKind::Receive))
            .field("idle_listeners", &self.listener_count(EventKind::Idle))
            .finish()
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
