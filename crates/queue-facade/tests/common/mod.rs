//! Common test utilities for queue-facade integration tests

use queue_facade::{InMemoryAdapter, InMemoryConfig, Queue, QueueOptions};
use std::sync::Arc;

/// Route `tracing` output through the test harness
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("queue_facade=debug")
        .with_test_writer()
        .try_init();
}

/// Create an in-memory queue that exists in its backend
#[allow(dead_code)]
pub async fn memory_queue(name: &str, config: InMemoryConfig) -> Queue {
    let queue = Queue::with_options(
        name,
        Arc::new(InMemoryAdapter::new(config).unwrap()),
        QueueOptions::default(),
    )
    .unwrap();
    queue.ensure_queue().await.unwrap();
    queue
}
