//! Tests for the queue facade.

use super::*;
use crate::adapter::{AdapterKind, AwaitMessagesCapable, DeleteMessageCapable};
use crate::adapters::{InMemoryAdapter, InMemoryConfig, NullAdapter};
use crate::events::{EventKind, EventPublisher, QueueEvent};
use crate::params::CLASS_FILTER;
use async_trait::async_trait;
use std::sync::Mutex;

// ============================================================================
// Test doubles
// ============================================================================

/// Adapter that records what the facade hands it
struct RecordingAdapter {
    send_params: &'static [&'static str],
    delete_capable: bool,
    delete_result: bool,
    native_await: bool,
    sent: Mutex<Vec<SendParameters>>,
    deleted: Mutex<Vec<Envelope>>,
    awaited: Mutex<u32>,
}

impl RecordingAdapter {
    fn new(send_params: &'static [&'static str]) -> Self {
        Self {
            send_params,
            delete_capable: true,
            delete_result: true,
            native_await: false,
            sent: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            awaited: Mutex::new(0),
        }
    }

    fn without_delete(mut self) -> Self {
        self.delete_capable = false;
        self
    }

    /// Delete reports the message as already gone
    fn refusing_delete(mut self) -> Self {
        self.delete_result = false;
        self
    }

    fn with_native_await(mut self) -> Self {
        self.native_await = true;
        self
    }

    fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl QueueAdapter for RecordingAdapter {
    fn name(&self) -> &str {
        "recording"
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Custom
    }

    async fn connect(&self) -> Result<(), QueueError> {
        Ok(())
    }

    async fn queue_exists(&self, _name: &QueueName) -> Result<bool, QueueError> {
        Ok(true)
    }

    async fn create_queue(&self, _name: &QueueName) -> Result<bool, QueueError> {
        Ok(false)
    }

    async fn delete_queue(&self, _name: &QueueName) -> Result<bool, QueueError> {
        Ok(true)
    }

    async fn queue_id(&self, name: &QueueName) -> Result<Option<String>, QueueError> {
        Ok(Some(format!("rec-{}", name)))
    }

    async fn send_message(
        &self,
        queue: &QueueDescriptor,
        mut envelope: Envelope,
        params: &SendParameters,
    ) -> Result<Envelope, QueueError> {
        self.sent.lock().unwrap().push(params.clone());
        envelope.set_delivery(queue.delivery_record(
            self.name(),
            None,
            crate::message::MessageId::new(),
            None,
            params.as_options().clone(),
        ));
        Ok(envelope)
    }

    async fn receive_messages(
        &self,
        _queue: &QueueDescriptor,
        _max_messages: u32,
        _params: &ReceiveParameters,
    ) -> Result<Vec<Envelope>, QueueError> {
        Ok(Vec::new())
    }

    fn available_send_params(&self) -> &[&'static str] {
        self.send_params
    }

    fn as_delete_message(&self) -> Option<&dyn DeleteMessageCapable> {
        if self.delete_capable {
            Some(self)
        } else {
            None
        }
    }

    fn as_await_messages(&self) -> Option<&dyn AwaitMessagesCapable> {
        if self.native_await {
            Some(self)
        } else {
            None
        }
    }
}

#[async_trait]
impl DeleteMessageCapable for RecordingAdapter {
    async fn delete_message(
        &self,
        _queue: &QueueDescriptor,
        envelope: &Envelope,
    ) -> Result<bool, QueueError> {
        self.deleted.lock().unwrap().push(envelope.clone());
        Ok(self.delete_result)
    }
}

#[async_trait]
impl AwaitMessagesCapable for RecordingAdapter {
    async fn await_messages(
        &self,
        queue: &QueueDescriptor,
        publisher: &dyn EventPublisher,
        _params: &ReceiveParameters,
        stop: &StopToken,
    ) -> Result<(), QueueError> {
        *self.awaited.lock().unwrap() += 1;
        publisher.publish(&QueueEvent::new(
            EventKind::Receive,
            queue.name.clone(),
            vec![Envelope::new("native")],
            stop.clone(),
        ));
        Ok(())
    }
}

async fn memory_queue(name: &str) -> Queue {
    let queue = Queue::new(name, Arc::new(InMemoryAdapter::default())).unwrap();
    queue.ensure_queue().await.unwrap();
    queue
}

// ============================================================================
// Construction
// ============================================================================

mod construction {
    use super::*;

    /// Verify that an empty queue name is rejected.
    #[test]
    fn test_empty_name_is_invalid_argument() {
        let result = Queue::new("", Arc::new(NullAdapter::new()));

        assert!(matches!(result, Err(QueueError::InvalidArgument { .. })));
    }

    /// Verify that a malformed queue name is rejected.
    #[test]
    fn test_malformed_name_is_rejected() {
        let err = Queue::new("bad name!", Arc::new(NullAdapter::new())).unwrap_err();

        assert!(err.is_invalid_argument());
    }

    /// Verify that invalid options are rejected.
    #[test]
    fn test_invalid_options_rejected() {
        let options = QueueOptions::default().with_metadata_key("");
        let result = Queue::with_options("q", Arc::new(NullAdapter::new()), options);

        assert!(matches!(result, Err(QueueError::Configuration(_))));
    }

    /// Verify that ensure_queue is idempotent.
    #[tokio::test]
    async fn test_ensure_queue_idempotent() {
        let queue = Queue::new("ensure", Arc::new(InMemoryAdapter::default())).unwrap();

        assert!(queue.ensure_queue().await.unwrap());
        assert!(!queue.ensure_queue().await.unwrap());
        assert!(queue.exists().await.unwrap());
        assert!(queue.queue_id().await.unwrap().is_some());

        assert!(queue.delete_queue().await.unwrap());
        assert!(!queue.exists().await.unwrap());
    }
}

// ============================================================================
// Capability predicates
// ============================================================================

mod predicates {
    use super::*;

    /// Verify the predicates against the in-memory adapter.
    #[test]
    fn test_memory_predicates() {
        let queue = Queue::new("caps", Arc::new(InMemoryAdapter::default())).unwrap();

        assert!(queue.can_delete_message());
        assert!(queue.can_count_messages());
        assert!(queue.can_list_queues());
        assert!(queue.can_schedule());
        assert!(queue.can_await());
        assert!(queue.is_await_emulation());
        assert!(queue.is_send_param_supported(SCHEDULE));
        assert!(queue.is_receive_param_supported(CLASS_FILTER));
        assert!(!queue.is_receive_param_supported("visibility_timeout"));
    }

    /// Verify that disabling emulation removes await support.
    #[test]
    fn test_await_without_emulation() {
        let options = QueueOptions::default().without_await_emulation();
        let queue = Queue::with_options("caps", Arc::new(NullAdapter::new()), options).unwrap();

        assert!(!queue.can_await());
        assert!(!queue.is_await_emulation());
    }

    /// Verify that native await is not reported as emulation.
    #[test]
    fn test_native_await_predicates() {
        let adapter = RecordingAdapter::new(&[]).with_native_await();
        let queue = Queue::new("caps", Arc::new(adapter)).unwrap();

        assert!(queue.can_await());
        assert!(!queue.is_await_emulation());
    }

    /// Verify that optional operations fail as unsupported on the null adapter.
    #[tokio::test]
    async fn test_null_optional_operations_unsupported() {
        let queue = Queue::new("nothing", Arc::new(NullAdapter::new())).unwrap();

        assert!(!queue.can_delete_message());
        assert!(queue.count().await.unwrap_err().is_unsupported());
        assert!(queue.list_queues().await.unwrap_err().is_unsupported());
        assert!(queue
            .delete_message(&Envelope::new("x"))
            .await
            .unwrap_err()
            .is_unsupported());
    }

    /// Verify that debug info reflects the adapter.
    #[test]
    fn test_debug_info_lists_capabilities() {
        let queue = Queue::new("debug", Arc::new(InMemoryAdapter::default())).unwrap();
        let info = queue.debug_info();

        assert_eq!(info.name, "debug");
        assert_eq!(info.adapter, "memory");
        assert_eq!(info.adapter_kind, "array");
        assert!(info.capabilities.contains(&Capability::DeleteMessage));
        assert!(!info.capabilities.contains(&Capability::AwaitMessages));
        assert!(info.await_emulation);

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["options"]["metadata_key"], "__queue");
    }
}

// ============================================================================
// Send and receive
// ============================================================================

mod send_receive {
    use super::*;

    /// Verify the basic receive scenario: one message, claimed once.
    #[tokio::test]
    async fn test_receive_claims_single_message_once() {
        let queue = memory_queue("scenario").await;
        queue.send("X", None).await.unwrap();

        let first = queue.receive(Some(5), None).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].content_str(), Some("X"));
        let handle = first[0].delivery().unwrap().handle.clone().unwrap();
        assert!(!handle.as_str().is_empty());

        let second = queue.receive(Some(5), None).await.unwrap();
        assert!(second.is_empty());
    }

    /// Verify that receive defaults to one message.
    #[tokio::test]
    async fn test_receive_defaults_to_one() {
        let queue = memory_queue("default-max").await;
        queue.send("a", None).await.unwrap();
        queue.send("b", None).await.unwrap();

        assert_eq!(queue.receive(None, None).await.unwrap().len(), 1);
    }

    /// Verify that zero max_messages is rejected.
    #[tokio::test]
    async fn test_receive_zero_is_invalid() {
        let queue = memory_queue("zero").await;

        let result = queue.receive(Some(0), None).await;

        assert!(matches!(result, Err(QueueError::InvalidArgument { .. })));
    }

    /// Verify that send stamps the default message class.
    #[tokio::test]
    async fn test_send_stamps_default_class() {
        let queue = memory_queue("class").await;

        let sent = queue.send("x", None).await.unwrap();
        let explicit = queue
            .send(Envelope::new("y").with_class("custom"), None)
            .await
            .unwrap();

        assert_eq!(sent.class.as_deref(), Some("envelope"));
        assert_eq!(explicit.class.as_deref(), Some("custom"));
    }

    /// Verify that a received envelope can be resent as a new message.
    #[tokio::test]
    async fn test_resend_replaces_delivery_record() {
        let queue = memory_queue("resend").await;
        queue.send("x", None).await.unwrap();
        let received = queue.receive(None, None).await.unwrap().remove(0);
        let old_id = received.delivery().unwrap().message_id.clone();

        let resent = queue.send(received, None).await.unwrap();
        let record = resent.delivery().unwrap();

        assert_ne!(record.message_id, old_id);
        assert!(record.handle.is_none());
        assert_eq!(queue.count().await.unwrap(), 1);
    }

    /// Verify that unknown send parameters are rejected before sending.
    #[tokio::test]
    async fn test_unknown_send_param_rejected() {
        let adapter = Arc::new(RecordingAdapter::new(&[SCHEDULE]));
        let queue = Queue::new("params", adapter.clone()).unwrap();

        let params = SendParameters::new().with("priority", serde_json::json!(5));
        let result = queue.send("x", Some(params)).await;

        assert!(matches!(result, Err(QueueError::InvalidArgument { .. })));
        assert_eq!(adapter.sent_count(), 0);
    }

    /// Verify that unknown receive parameters are rejected.
    #[tokio::test]
    async fn test_unknown_receive_param_rejected() {
        let queue = memory_queue("rparams").await;

        let params = ReceiveParameters::new().with("peek", serde_json::json!(true));
        let result = queue.receive(None, Some(params)).await;

        assert!(matches!(result, Err(QueueError::InvalidArgument { .. })));
    }

    /// Verify that the class filter selects messages by class.
    #[tokio::test]
    async fn test_receive_with_class_filter() {
        let queue = memory_queue("filter").await;
        queue.send("plain", None).await.unwrap();
        queue
            .send(Envelope::new("job").with_class("job"), None)
            .await
            .unwrap();

        let jobs = queue
            .receive(Some(10), Some(ReceiveParameters::new().with_class_filter("job")))
            .await
            .unwrap();

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].content_str(), Some("job"));
    }

    /// Verify that deleting with a stale handle fails and deletes nothing.
    #[tokio::test]
    async fn test_delete_with_stale_handle_fails() {
        let adapter = InMemoryAdapter::new(InMemoryConfig {
            max_queue_size: 10,
            claim_timeout_secs: Some(0),
        })
        .unwrap();
        let queue = Queue::new("stale", Arc::new(adapter)).unwrap();
        queue.ensure_queue().await.unwrap();
        queue.send("x", None).await.unwrap();

        let first = queue.receive(None, None).await.unwrap().remove(0);
        let second = queue.receive(None, None).await.unwrap().remove(0);

        assert!(!queue.delete_message(&first).await.unwrap());
        assert!(queue.delete_message(&second).await.unwrap());
    }

    /// Verify that the delivery record is exposed under the metadata key.
    #[tokio::test]
    async fn test_delivery_record_in_metadata() {
        let queue = memory_queue("record").await;
        queue.send("x", None).await.unwrap();
        let received = queue.receive(None, None).await.unwrap().remove(0);

        let metadata = queue.message_metadata(&received).unwrap();

        assert_eq!(metadata["__queue"]["queue_name"], "record");
    }

    /// Verify that application metadata under the reserved key is dropped on send.
    #[tokio::test]
    async fn test_reserved_metadata_key_stripped_on_send() {
        let queue = memory_queue("reserved").await;
        let message = Envelope::new("x")
            .with_metadata("__queue", serde_json::json!("app"))
            .with_metadata("trace", serde_json::json!("t-1"));

        let sent = queue.send(message, None).await.unwrap();
        let received = queue.receive(None, None).await.unwrap().remove(0);

        assert!(!sent.metadata.contains_key("__queue"));
        assert!(!received.metadata.contains_key("__queue"));
        assert_eq!(received.metadata["trace"], "t-1");

        let metadata = queue.message_metadata(&received).unwrap();
        assert_eq!(metadata["__queue"]["queue_name"], "reserved");
    }

    /// Verify that only the configured metadata key is reserved.
    #[tokio::test]
    async fn test_custom_metadata_key_reserved() {
        let options = QueueOptions::default().with_metadata_key("_q");
        let queue =
            Queue::with_options("custom", Arc::new(InMemoryAdapter::default()), options).unwrap();
        queue.ensure_queue().await.unwrap();
        let message = Envelope::new("x")
            .with_metadata("_q", serde_json::json!("app"))
            .with_metadata("__queue", serde_json::json!("app"));

        queue.send(message, None).await.unwrap();
        let received = queue.receive(None, None).await.unwrap().remove(0);

        assert!(!received.metadata.contains_key("_q"));
        assert_eq!(received.metadata["__queue"], "app");
        assert_eq!(
            queue.message_metadata(&received).unwrap()["_q"]["queue_name"],
            "custom"
        );
    }

    /// Verify that an envelope rebuilt from flat metadata can still be deleted.
    #[tokio::test]
    async fn test_envelope_from_metadata_keeps_claim() {
        let queue = memory_queue("flat").await;
        queue
            .send(Envelope::new("x").with_metadata("trace", serde_json::json!("t-2")), None)
            .await
            .unwrap();
        let received = queue.receive(None, None).await.unwrap().remove(0);

        let metadata = queue.message_metadata(&received).unwrap();
        let rebuilt = queue
            .envelope_from_metadata(received.content().clone(), metadata)
            .unwrap();

        assert_eq!(rebuilt.delivery(), received.delivery());
        assert_eq!(rebuilt.metadata["trace"], "t-2");
        assert!(queue.delete_message(&rebuilt).await.unwrap());
    }
}

// ============================================================================
// Scheduling
// ============================================================================

mod scheduling {
    use super::*;

    /// Verify that scheduling on an adapter without schedule support sends nothing.
    #[tokio::test]
    async fn test_schedule_unsupported_sends_nothing() {
        let adapter = Arc::new(RecordingAdapter::new(&[]));
        let queue = Queue::new("sched", adapter.clone()).unwrap();

        let result = queue.schedule("x", Timestamp::now(), None).await;

        assert!(matches!(
            result,
            Err(QueueError::UnsupportedOperation { ref capability }) if capability == "schedule"
        ));
        assert_eq!(adapter.sent_count(), 0);
    }

    /// Verify that a repeat is rejected when the adapter cannot repeat.
    #[tokio::test]
    async fn test_repeat_without_support_is_invalid() {
        let adapter = Arc::new(RecordingAdapter::new(&[SCHEDULE]));
        let queue = Queue::new("sched", adapter.clone()).unwrap();

        let result = queue
            .schedule("x", Timestamp::now(), Some(Duration::minutes(5)))
            .await;

        assert!(matches!(result, Err(QueueError::InvalidArgument { .. })));
        assert_eq!(adapter.sent_count(), 0);
    }

    /// Verify that schedule passes both keys to the adapter.
    #[tokio::test]
    async fn test_schedule_passes_parameters() {
        let adapter = Arc::new(RecordingAdapter::new(&[SCHEDULE, REPEATING_INTERVAL]));
        let queue = Queue::new("sched", adapter.clone()).unwrap();
        let when = Timestamp::now().checked_plus(Duration::hours(1)).unwrap();

        queue
            .schedule("x", when, Some(Duration::minutes(5)))
            .await
            .unwrap();

        let sent = adapter.sent.lock().unwrap();
        assert_eq!(sent[0].repeating_interval(), Some(Duration::minutes(5)));
        assert_eq!(
            sent[0].schedule().map(|t| t.as_datetime().timestamp()),
            Some(when.as_datetime().timestamp())
        );
    }

    /// Verify that unschedule strips exactly the schedule keys and deletes.
    #[tokio::test]
    async fn test_unschedule_strips_schedule_keys() {
        let adapter = Arc::new(RecordingAdapter::new(&[
            SCHEDULE,
            REPEATING_INTERVAL,
            "priority",
        ]));
        let queue = Queue::new("sched", adapter.clone()).unwrap();
        let params = SendParameters::new()
            .with_schedule(Timestamp::now())
            .with_repeating_interval(Duration::seconds(30))
            .with("priority", serde_json::json!(9));
        let mut sent = queue.send("x", Some(params)).await.unwrap();

        assert!(queue.unschedule(&mut sent).await.unwrap());

        let options = &sent.delivery().unwrap().options;
        assert!(!options.contains_key(SCHEDULE));
        assert!(!options.contains_key(REPEATING_INTERVAL));
        assert_eq!(options.get("priority"), Some(&serde_json::json!(9)));
        assert_eq!(adapter.deleted.lock().unwrap().len(), 1);
    }

    /// Verify that a refused delete leaves the caller's record untouched.
    #[tokio::test]
    async fn test_unschedule_refused_keeps_schedule_keys() {
        let adapter =
            Arc::new(RecordingAdapter::new(&[SCHEDULE, REPEATING_INTERVAL]).refusing_delete());
        let queue = Queue::new("sched", adapter.clone()).unwrap();
        let mut sent = queue
            .schedule("x", Timestamp::now(), Some(Duration::seconds(30)))
            .await
            .unwrap();
        let before = sent.clone();

        assert!(!queue.unschedule(&mut sent).await.unwrap());

        assert_eq!(sent, before);
        let options = &sent.delivery().unwrap().options;
        assert!(options.contains_key(SCHEDULE));
        assert!(options.contains_key(REPEATING_INTERVAL));

        // The adapter was asked to delete the stripped copy
        let deleted = adapter.deleted.lock().unwrap();
        assert!(!deleted[0].delivery().unwrap().options.contains_key(SCHEDULE));
    }

    /// Verify that a second unschedule of the same message reports false.
    #[tokio::test]
    async fn test_unschedule_twice_reports_false() {
        let queue = memory_queue("twice").await;
        let when = Timestamp::now().checked_plus(Duration::hours(1)).unwrap();
        let mut sent = queue.schedule("later", when, None).await.unwrap();

        assert!(queue.unschedule(&mut sent).await.unwrap());
        assert!(!queue.unschedule(&mut sent).await.unwrap());
    }

    /// Verify that oversized repeat intervals are rejected before reaching the adapter.
    #[tokio::test]
    async fn test_oversized_repeat_rejected() {
        let queue = memory_queue("far").await;
        let past = Timestamp::now().checked_plus(Duration::seconds(-1)).unwrap();

        for interval in [
            Duration::seconds(MAX_REPEATING_INTERVAL_SECS + 1),
            Duration::seconds(1_000_000_000_000_000),
            Duration::MAX,
            Duration::milliseconds(500),
        ] {
            let err = queue.schedule("x", past, Some(interval)).await.unwrap_err();
            assert!(err.is_invalid_argument(), "{:?} accepted", interval);
        }
        assert_eq!(queue.count().await.unwrap(), 0);

        // The backend stays usable after the rejections
        queue.schedule("ok", past, Some(Duration::hours(1))).await.unwrap();
        let received = queue.receive(None, None).await.unwrap();
        assert_eq!(received[0].content_str(), Some("ok"));
    }

    /// Verify that send validates a raw repeating interval.
    #[tokio::test]
    async fn test_send_rejects_raw_interval_out_of_range() {
        let adapter = Arc::new(RecordingAdapter::new(&[SCHEDULE, REPEATING_INTERVAL]));
        let queue = Queue::new("raw", adapter.clone()).unwrap();

        for raw in [serde_json::json!(i64::MAX), serde_json::json!(0), serde_json::json!("1h")] {
            let params = SendParameters::new().with(REPEATING_INTERVAL, raw.clone());
            let err = queue.send("x", Some(params)).await.unwrap_err();
            assert!(err.is_invalid_argument(), "{} accepted", raw);
        }
        assert_eq!(adapter.sent_count(), 0);

        let params = SendParameters::new()
            .with(REPEATING_INTERVAL, serde_json::json!(MAX_REPEATING_INTERVAL_SECS));
        queue.send("x", Some(params)).await.unwrap();
        assert_eq!(adapter.sent_count(), 1);
    }

    /// Verify that the longest accepted interval re-arms instead of overflowing.
    #[tokio::test]
    async fn test_max_interval_repeat_rearms() {
        let queue = memory_queue("century").await;
        let params = SendParameters::new()
            .with(REPEATING_INTERVAL, serde_json::json!(MAX_REPEATING_INTERVAL_SECS));

        queue.send("x", Some(params)).await.unwrap();

        assert_eq!(queue.receive(None, None).await.unwrap().len(), 1);
        assert!(queue.receive(None, None).await.unwrap().is_empty());
        assert_eq!(queue.count().await.unwrap(), 1);
    }

    /// Verify that unschedule needs a delivery record.
    #[tokio::test]
    async fn test_unschedule_without_record_unsupported() {
        let queue = memory_queue("sched").await;
        let mut envelope = Envelope::new("never sent");

        let err = queue.unschedule(&mut envelope).await.unwrap_err();

        assert!(err.is_unsupported());
    }

    /// Verify that unschedule needs the delete capability.
    #[tokio::test]
    async fn test_unschedule_without_delete_unsupported() {
        let adapter = Arc::new(RecordingAdapter::new(&[SCHEDULE]).without_delete());
        let queue = Queue::new("sched", adapter).unwrap();
        let mut sent = queue.schedule("x", Timestamp::now(), None).await.unwrap();

        let err = queue.unschedule(&mut sent).await.unwrap_err();

        assert!(matches!(
            err,
            QueueError::UnsupportedOperation { ref capability } if capability == "delete_message"
        ));
    }

    /// Verify that schedule then unschedule leaves no trace in the backend.
    #[tokio::test]
    async fn test_schedule_unschedule_leaves_no_trace() {
        let queue = memory_queue("trace").await;
        let when = Timestamp::now().checked_plus(Duration::hours(1)).unwrap();

        let mut sent = queue
            .schedule("later", when, Some(Duration::minutes(1)))
            .await
            .unwrap();
        assert_eq!(queue.count().await.unwrap(), 1);

        assert!(queue.unschedule(&mut sent).await.unwrap());
        assert_eq!(queue.count().await.unwrap(), 0);
        assert!(queue.receive(Some(10), None).await.unwrap().is_empty());
    }
}

// ============================================================================
// Await
// ============================================================================

mod awaiting {
    use super::*;

    /// Verify that emulated await delivers a waiting message and stops.
    #[tokio::test]
    async fn test_emulated_await_receives_and_stops() {
        let queue = memory_queue("await").await;
        queue.send("ping", None).await.unwrap();

        let received = Arc::new(Mutex::new(Vec::new()));
        {
            let received = Arc::clone(&received);
            queue.events().attach_fn(EventKind::Receive, move |event| {
                received
                    .lock()
                    .unwrap()
                    .extend(event.messages().iter().cloned());
                event.stop_await();
            });
        }

        queue.await_messages(None).await.unwrap();

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].content_str(), Some("ping"));
    }

    /// Verify that idle notifications fire while the queue is empty.
    #[tokio::test]
    async fn test_emulated_await_idles_until_stopped() {
        let options = QueueOptions::default().with_idle_backoff(std::time::Duration::ZERO);
        let queue =
            Queue::with_options("idle", Arc::new(InMemoryAdapter::default()), options).unwrap();
        queue.ensure_queue().await.unwrap();

        let idles = Arc::new(Mutex::new(0));
        {
            let idles = Arc::clone(&idles);
            queue.events().attach_fn(EventKind::Idle, move |event| {
                let mut idles = idles.lock().unwrap();
                *idles += 1;
                if *idles == 3 {
                    event.stop_await();
                }
            });
        }

        queue.await_messages(None).await.unwrap();

        assert_eq!(*idles.lock().unwrap(), 3);
    }

    /// Verify that await fails when emulation is disabled and there is no native support.
    #[tokio::test]
    async fn test_await_without_emulation_unsupported() {
        let options = QueueOptions::default().without_await_emulation();
        let queue =
            Queue::with_options("await", Arc::new(InMemoryAdapter::default()), options).unwrap();

        let err = queue.await_messages(None).await.unwrap_err();

        assert!(matches!(
            err,
            QueueError::UnsupportedOperation { ref capability } if capability == "await_messages"
        ));
    }

    /// Verify that native await is delegated to the adapter.
    #[tokio::test]
    async fn test_native_await_delegated() {
        let adapter = Arc::new(RecordingAdapter::new(&[]).with_native_await());
        let queue = Queue::new("native", adapter.clone()).unwrap();

        let seen = Arc::new(Mutex::new(0));
        {
            let seen = Arc::clone(&seen);
            queue
                .events()
                .attach_fn(EventKind::Receive, move |_| *seen.lock().unwrap() += 1);
        }

        queue.await_messages(None).await.unwrap();

        assert_eq!(*adapter.awaited.lock().unwrap(), 1);
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    /// Verify that a backend failure ends emulated await with the error.
    #[tokio::test]
    async fn test_emulated_await_propagates_receive_error() {
        // Queue never created, so every receive fails
        let queue = Queue::new("missing", Arc::new(InMemoryAdapter::default())).unwrap();

        let err = queue.await_messages(None).await.unwrap_err();

        assert!(matches!(err, QueueError::QueueNotFound { .. }));
    }
}
