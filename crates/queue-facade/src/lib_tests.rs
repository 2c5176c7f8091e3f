//! Tests for the crate-level API surface.

use super::*;
use std::sync::Arc;

#[test]
fn test_queue_name_validation() {
    // Valid names
    assert!(QueueName::new("test-queue".to_string()).is_ok());
    assert!(QueueName::new("queue_123".to_string()).is_ok());
    assert!(QueueName::new("jobs.high".to_string()).is_ok());

    // Invalid names
    assert!(QueueName::new("".to_string()).is_err());
    assert!(QueueName::new("-leading-hyphen".to_string()).is_err());
    assert!(QueueName::new("double--hyphen".to_string()).is_err());
    assert!(QueueName::new("special@chars".to_string()).is_err());
}

#[tokio::test]
async fn test_round_trip_through_root_exports() {
    let queue = Queue::new("root", Arc::new(InMemoryAdapter::default())).unwrap();
    queue.ensure_queue().await.unwrap();

    queue
        .send(Envelope::new("hello").with_class("greeting"), None)
        .await
        .unwrap();
    let received = queue
        .receive(None, Some(ReceiveParameters::new().with_class_filter("greeting")))
        .await
        .unwrap();

    assert_eq!(received.len(), 1);
    assert!(queue.delete_message(&received[0]).await.unwrap());
    assert_eq!(queue.count().await.unwrap(), 0);
}
