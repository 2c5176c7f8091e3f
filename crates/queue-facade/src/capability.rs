//! Capability vocabulary and structural support checks.

use crate::adapter::QueueAdapter;
use crate::params::{REPEATING_INTERVAL, SCHEDULE};
use serde::{Deserialize, Serialize};

/// Optional behaviours an adapter may provide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    DeleteMessage,
    CountMessages,
    ListQueues,
    AwaitMessages,
    Schedule,
    RepeatingSchedule,
}

impl Capability {
    /// Every capability, in declaration order
    pub const ALL: [Capability; 6] = [
        Capability::DeleteMessage,
        Capability::CountMessages,
        Capability::ListQueues,
        Capability::AwaitMessages,
        Capability::Schedule,
        Capability::RepeatingSchedule,
    ];

    /// Stable name used in errors and debug output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeleteMessage => "delete_message",
            Self::CountMessages => "count_messages",
            Self::ListQueues => "list_queues",
            Self::AwaitMessages => "await_messages",
            Self::Schedule => "schedule",
            Self::RepeatingSchedule => "repeating_interval",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check whether `adapter` satisfies the optional contract for `capability`
pub fn supports(adapter: &dyn QueueAdapter, capability: Capability) -> bool {
    match capability {
        Capability::DeleteMessage => adapter.as_delete_message().is_some(),
        Capability::CountMessages => adapter.as_count_messages().is_some(),
        Capability::ListQueues => adapter.as_list_queues().is_some(),
        Capability::AwaitMessages => adapter.as_await_messages().is_some(),
        Capability::Schedule => adapter.available_send_params().contains(&SCHEDULE),
        Capability::RepeatingSchedule => {
            adapter.available_send_params().contains(&REPEATING_INTERVAL)
        }
    }
}

/// Every capability `adapter` supports
pub fn capabilities(adapter: &dyn QueueAdapter) -> Vec<Capability> {
    Capability::ALL
        .into_iter()
        .filter(|capability| supports(adapter, *capability))
        .collect()
}

#[cfg(test)]
#[path = "capability_tests.rs"]
mod tests;
