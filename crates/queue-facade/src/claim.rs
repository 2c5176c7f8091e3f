//! Atomic message claiming on top of a single find-and-modify primitive.
//!
//! A backend only has to offer [`ClaimStore::find_and_claim`]: read one record,
//! mark it claimed if it is still claimable, and hand back the record as it
//! was *before* the update. Everything else here is plain sequencing. Two
//! receivers racing for the same record both get a snapshot, but only one of
//! them sees it unclaimed, so only one of them returns it. No lock is held
//! outside the backend.

use crate::adapter::QueueDescriptor;
use crate::error::QueueError;
use crate::message::{ClaimHandle, Envelope, MessageId, Metadata, QueueName, Timestamp};
use crate::params::{OptionMap, ReceiveParameters};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Duration;
use tracing::{debug, warn};

/// Backend record decoded at the adapter boundary
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMessage {
    pub id: MessageId,
    pub class: Option<String>,
    pub content: Bytes,
    pub metadata: Metadata,
    /// Send parameters the message was stored with
    pub options: OptionMap,
    pub handle: Option<ClaimHandle>,
    pub claimed_at: Option<Timestamp>,
    /// Earliest time the message may be handed out
    pub available_at: Timestamp,
}

impl StoredMessage {
    /// Create an unclaimed record available at `available_at`
    pub fn new(envelope: &Envelope, options: OptionMap, available_at: Timestamp) -> Self {
        Self {
            id: MessageId::new(),
            class: envelope.class.clone(),
            content: envelope.content().clone(),
            metadata: envelope.metadata.clone(),
            options,
            handle: None,
            claimed_at: None,
            available_at,
        }
    }

    /// Check whether a receiver may claim this record at `now`
    ///
    /// A claim older than `release_after` no longer blocks a new claim.
    pub fn is_claimable(&self, now: Timestamp, release_after: Option<Duration>) -> bool {
        if !self.available_at.is_due(now) {
            return false;
        }

        match (&self.handle, self.claimed_at, release_after) {
            (None, _, _) => true,
            // A release time past the end of the calendar never arrives
            (Some(_), Some(claimed_at), Some(timeout)) => claimed_at
                .checked_plus(timeout)
                .is_some_and(|release| release.is_due(now)),
            _ => false,
        }
    }

    /// Check whether the record matches a class filter
    pub fn matches_class(&self, class_filter: Option<&str>) -> bool {
        match class_filter {
            Some(filter) => self.class.as_deref() == Some(filter),
            None => true,
        }
    }
}

/// A single claim attempt
#[derive(Debug, Clone)]
pub struct ClaimRequest {
    pub id: MessageId,
    pub handle: ClaimHandle,
    pub now: Timestamp,
}

/// Storage primitives the claim protocol is built from
#[async_trait]
pub trait ClaimStore: Send + Sync {
    /// Age after which a claim is released; `None` keeps claims forever
    fn claim_timeout(&self) -> Option<Duration> {
        None
    }

    /// Ids of claimable records, oldest first, at most `limit` of them
    async fn candidates(
        &self,
        queue: &QueueName,
        class_filter: Option<&str>,
        limit: usize,
        now: Timestamp,
    ) -> Result<Vec<MessageId>, QueueError>;

    /// Atomically claim the record if it is claimable and return its pre-update state
    ///
    /// Returns `None` when the record no longer exists. The returned snapshot
    /// must reflect the record exactly as it was before this call touched it.
    async fn find_and_claim(
        &self,
        queue: &QueueName,
        request: &ClaimRequest,
    ) -> Result<Option<StoredMessage>, QueueError>;

    /// Remove a record only if its current handle equals `handle`
    async fn delete_if_handle(
        &self,
        queue: &QueueName,
        id: &MessageId,
        handle: Option<&ClaimHandle>,
    ) -> Result<bool, QueueError>;
}

/// Claim up to `max_messages` messages and wrap them in envelopes
///
/// Candidates lost to a concurrent receiver are skipped, not retried.
pub async fn claim_messages<S>(
    store: &S,
    adapter_name: &str,
    queue: &QueueDescriptor,
    queue_id: Option<String>,
    max_messages: u32,
    params: &ReceiveParameters,
) -> Result<Vec<Envelope>, QueueError>
where
    S: ClaimStore + ?Sized,
{
    let limit = max_messages as usize;
    let now = Timestamp::now();
    let release_after = store.claim_timeout();

    let candidates = store
        .candidates(&queue.name, params.class_filter(), limit, now)
        .await?;

    let mut claimed = Vec::with_capacity(candidates.len().min(limit));
    for id in candidates {
        if claimed.len() >= limit {
            break;
        }

        let handle = ClaimHandle::generate();
        let request = ClaimRequest {
            id: id.clone(),
            handle: handle.clone(),
            now,
        };

        let Some(previous) = store.find_and_claim(&queue.name, &request).await? else {
            debug!(queue = %queue.name, message_id = %id, "Candidate vanished before claim");
            continue;
        };

        if !previous.is_claimable(now, release_after) {
            debug!(queue = %queue.name, message_id = %id, "Lost claim race");
            continue;
        }

        let record = queue.delivery_record(
            adapter_name,
            Some(handle),
            previous.id,
            queue_id.clone(),
            previous.options,
        );

        let mut envelope = Envelope::new(previous.content);
        envelope.metadata = previous.metadata;
        envelope.class = previous.class;
        envelope.set_delivery(record);
        claimed.push(envelope);
    }

    Ok(claimed)
}

/// Delete the message behind an envelope if its handle is still current
pub async fn delete_claimed<S>(
    store: &S,
    queue: &QueueDescriptor,
    envelope: &Envelope,
) -> Result<bool, QueueError>
where
    S: ClaimStore + ?Sized,
{
    let Some(record) = envelope.delivery() else {
        return Ok(false);
    };

    if record.queue_name != queue.name {
        warn!(
            queue = %queue.name,
            record_queue = %record.queue_name,
            "Refusing to delete a message received from another queue"
        );
        return Ok(false);
    }

    store
        .delete_if_handle(&queue.name, &record.message_id, record.handle.as_ref())
        .await
}

#[cfg(test)]
#[path = "claim_tests.rs"]
mod tests;
