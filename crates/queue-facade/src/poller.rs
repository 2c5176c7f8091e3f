//! Await emulation for adapters without a native blocking wait.
//!
//! The poller repeatedly runs a receive, publishes a `Receive` or `Idle`
//! event for each result, and exits once its [`StopToken`] is cancelled.
//! Cancellation is observed between iterations only; a receive that is in
//! flight always completes.

use crate::error::QueueError;
use crate::events::{EventKind, EventPublisher, QueueEvent};
use crate::message::{Envelope, QueueName};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, trace};

/// Cooperative cancellation signal shared between the loop and its listeners
pub type StopToken = tokio_util::sync::CancellationToken;

/// Await loop states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Last receive returned messages
    Polling,
    /// Last receive returned nothing
    Idle,
    /// Loop has exited
    Stopped,
}

/// Polling state machine
#[derive(Debug)]
pub struct AwaitPoller {
    state: PollState,
    idle_backoff: Duration,
    stop: StopToken,
    iterations: u64,
}

impl AwaitPoller {
    /// Create a poller that sleeps `idle_backoff` after each idle iteration
    pub fn new(idle_backoff: Duration, stop: StopToken) -> Self {
        Self {
            state: PollState::Polling,
            idle_backoff,
            stop,
            iterations: 0,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    /// Number of completed receive iterations
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn stop_token(&self) -> &StopToken {
        &self.stop
    }

    /// Drive the loop until stopped or a receive fails
    ///
    /// A receive error stops the loop and is returned unchanged.
    pub async fn run<F, Fut>(
        &mut self,
        queue: &QueueName,
        publisher: &dyn EventPublisher,
        mut receive: F,
    ) -> Result<(), QueueError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Vec<Envelope>, QueueError>>,
    {
        debug!(queue = %queue, "Await emulation started");

        while !self.stop.is_cancelled() {
            let messages = match receive().await {
                Ok(messages) => messages,
                Err(err) => {
                    self.state = PollState::Stopped;
                    return Err(err);
                }
            };
            self.iterations += 1;

            let kind = if messages.is_empty() {
                self.state = PollState::Idle;
                EventKind::Idle
            } else {
                self.state = PollState::Polling;
                EventKind::Receive
            };
            trace!(queue = %queue, state = ?self.state, count = messages.len(), "Poll iteration");

            let event = QueueEvent::new(kind, queue.clone(), messages, self.stop.clone());
            publisher.publish(&event);

            if kind == EventKind::Idle && !self.idle_backoff.is_zero() {
                tokio::select! {
                    _ = self.stop.cancelled() => {}
                    _ = tokio::time::sleep(self.idle_backoff) => {}
                }
            }
        }

        self.state = PollState::Stopped;
        debug!(queue = %queue, iterations = self.iterations, "Await emulation stopped");
        Ok(())
    }
}

#[cfg(test)]
#[path = "poller_tests.rs"]
mod tests;
