//! # Queue Facade
//!
//! Backend-agnostic message queue with capability-negotiated adapters.
//!
//! This library provides:
//! - One send/receive/delete API over any storage adapter
//! - Capability discovery for optional operations
//! - At-most-one-receiver claiming built on a single atomic primitive
//! - Scheduled and repeating delivery where the adapter supports it
//! - Blocking await, native or emulated by polling, with idle/receive events
//!
//! ## Module Organization
//!
//! - [`error`] - Error types for all queue operations
//! - [`message`] - Identifiers, envelopes and delivery records
//! - [`params`] - Send and receive parameter sets
//! - [`config`] - Per-queue options
//! - [`adapter`] - Adapter contract and capability traits
//! - [`capability`] - Capability vocabulary and support checks
//! - [`claim`] - Atomic claim protocol
//! - [`events`] - Await notifications and listeners
//! - [`poller`] - Await emulation state machine
//! - [`queue`] - The queue facade
//! - [`adapters`] - In-memory and null adapters
//! - [`factory`] - Building queues from configuration

// Module declarations
pub mod adapter;
pub mod adapters;
pub mod capability;
pub mod claim;
pub mod config;
pub mod error;
pub mod events;
pub mod factory;
pub mod message;
pub mod params;
pub mod poller;
pub mod queue;

// Re-export commonly used types at crate root for convenience
pub use adapter::{
    AdapterKind, AwaitMessagesCapable, CountMessagesCapable, DeleteMessageCapable,
    ListQueuesCapable, QueueAdapter, QueueDescriptor,
};
pub use adapters::{InMemoryAdapter, InMemoryConfig, NullAdapter};
pub use capability::{capabilities, supports, Capability};
pub use claim::{ClaimRequest, ClaimStore, StoredMessage};
pub use config::QueueOptions;
pub use error::{ConfigurationError, QueueError, ValidationError};
pub use events::{EventDispatcher, EventKind, ListenerId, QueueEvent, QueueEventListener};
pub use factory::{AdapterConfig, QueueFactory, QueueFactoryConfig};
pub use message::{
    ClaimHandle, DeliveryRecord, Envelope, MessageId, Metadata, QueueName, Timestamp,
};
pub use params::{ReceiveParameters, SendParameters};
pub use poller::{AwaitPoller, PollState, StopToken};
pub use queue::{Queue, QueueDebugInfo};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
