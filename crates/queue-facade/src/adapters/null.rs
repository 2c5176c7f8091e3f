//! Adapter that stores nothing.
//!
//! Useful as a placeholder binding: existence checks answer "no", every
//! operation that would touch a message fails as unsupported.

use crate::adapter::{AdapterKind, QueueAdapter, QueueDescriptor};
use crate::error::QueueError;
use crate::message::{Envelope, QueueName};
use crate::params::{ReceiveParameters, SendParameters};
use async_trait::async_trait;

#[cfg(test)]
#[path = "null_tests.rs"]
mod tests;

/// Adapter with no storage and no capabilities
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAdapter;

impl NullAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl QueueAdapter for NullAdapter {
    fn name(&self) -> &str {
        "null"
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Null
    }

    async fn connect(&self) -> Result<(), QueueError> {
        Ok(())
    }

    async fn queue_exists(&self, _name: &QueueName) -> Result<bool, QueueError> {
        Ok(false)
    }

    async fn create_queue(&self, _name: &QueueName) -> Result<bool, QueueError> {
        Err(QueueError::unsupported("create_queue"))
    }

    async fn delete_queue(&self, _name: &QueueName) -> Result<bool, QueueError> {
        Err(QueueError::unsupported("delete_queue"))
    }

    async fn queue_id(&self, _name: &QueueName) -> Result<Option<String>, QueueError> {
        Ok(None)
    }

    async fn send_message(
        &self,
        _queue: &QueueDescriptor,
        _envelope: Envelope,
        _params: &SendParameters,
    ) -> Result<Envelope, QueueError> {
        Err(QueueError::unsupported("send_message"))
    }

    async fn receive_messages(
        &self,
        _queue: &QueueDescriptor,
        _max_messages: u32,
        _params: &ReceiveParameters,
    ) -> Result<Vec<Envelope>, QueueError> {
        Err(QueueError::unsupported("receive_messages"))
    }
}
