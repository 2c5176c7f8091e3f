//! Send and receive parameter sets.
//!
//! Parameters are plain key/value maps so adapters can declare their own
//! extensions. The facade validates every key against the names the bound
//! adapter advertises before the adapter ever sees the map.

use crate::error::QueueError;
use crate::message::Timestamp;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Deliver the message no earlier than this time (RFC 3339 timestamp)
pub const SCHEDULE: &str = "schedule";

/// Re-deliver the message every N seconds after the first delivery
pub const REPEATING_INTERVAL: &str = "repeating_interval";

/// Only receive messages whose class label equals this value
pub const CLASS_FILTER: &str = "class_filter";

/// Longest accepted repeat interval, in seconds (roughly a century)
pub const MAX_REPEATING_INTERVAL_SECS: i64 = 100 * 366 * 24 * 60 * 60;

/// Raw option map as stored in a delivery record
pub type OptionMap = BTreeMap<String, Value>;

/// Remove the scheduling keys from an option map, leaving everything else
pub fn strip_schedule(options: &mut OptionMap) {
    options.remove(SCHEDULE);
    options.remove(REPEATING_INTERVAL);
}

/// Check every key in `names` against the adapter's declared vocabulary
pub(crate) fn ensure_supported<'a>(
    direction: &str,
    names: impl IntoIterator<Item = &'a String>,
    supported: &[&str],
) -> Result<(), QueueError> {
    for name in names {
        if !supported.contains(&name.as_str()) {
            return Err(QueueError::invalid_argument(format!(
                "{} parameter '{}' is not supported by this adapter",
                direction, name
            )));
        }
    }
    Ok(())
}

// ============================================================================
// SendParameters
// ============================================================================

/// Options applied when sending a message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SendParameters {
    values: OptionMap,
}

impl SendParameters {
    /// Create an empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an arbitrary parameter
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Set the due time for scheduled delivery
    pub fn with_schedule(mut self, when: Timestamp) -> Self {
        self.set_schedule(when);
        self
    }

    /// Set the repeat interval for scheduled delivery
    pub fn with_repeating_interval(mut self, interval: Duration) -> Self {
        self.set_repeating_interval(interval);
        self
    }

    /// Set the due time for scheduled delivery
    pub fn set_schedule(&mut self, when: Timestamp) {
        self.values.insert(
            SCHEDULE.to_string(),
            Value::String(when.as_datetime().to_rfc3339()),
        );
    }

    /// Set the repeat interval for scheduled delivery
    pub fn set_repeating_interval(&mut self, interval: Duration) {
        self.values.insert(
            REPEATING_INTERVAL.to_string(),
            Value::from(interval.num_seconds()),
        );
    }

    /// Due time, if one was set and parses
    pub fn schedule(&self) -> Option<Timestamp> {
        self.values
            .get(SCHEDULE)
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
    }

    /// Repeat interval, if one was set and is representable
    pub fn repeating_interval(&self) -> Option<Duration> {
        self.values
            .get(REPEATING_INTERVAL)
            .and_then(Value::as_i64)
            .and_then(Duration::try_seconds)
    }

    /// Check the scheduling keys hold values an adapter can act on
    ///
    /// `schedule` must be an RFC 3339 timestamp. `repeating_interval` must be
    /// a whole number of seconds between 1 and [`MAX_REPEATING_INTERVAL_SECS`],
    /// and the first repeat after the schedule must still be a valid time.
    pub fn validate(&self) -> Result<(), QueueError> {
        let schedule = match self.values.get(SCHEDULE) {
            Some(_) => Some(self.schedule().ok_or_else(|| {
                QueueError::invalid_argument("schedule must be an RFC 3339 timestamp")
            })?),
            None => None,
        };

        let Some(raw) = self.values.get(REPEATING_INTERVAL) else {
            return Ok(());
        };

        let seconds = raw
            .as_i64()
            .filter(|secs| (1..=MAX_REPEATING_INTERVAL_SECS).contains(secs))
            .ok_or_else(|| {
                QueueError::invalid_argument(format!(
                    "repeating_interval must be 1 to {} seconds",
                    MAX_REPEATING_INTERVAL_SECS
                ))
            })?;

        let interval = Duration::try_seconds(seconds)
            .ok_or_else(|| QueueError::invalid_argument("repeating_interval is out of range"))?;
        let first = schedule.unwrap_or_else(Timestamp::now);
        if first.checked_plus(interval).is_none() {
            return Err(QueueError::invalid_argument(
                "repeating_interval overflows the schedule",
            ));
        }

        Ok(())
    }

    /// Raw parameter value
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Names of every parameter present
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    /// Check whether no parameters are set
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw option map, as embedded into delivery records
    pub fn as_options(&self) -> &OptionMap {
        &self.values
    }

    /// Consume into the raw option map
    pub fn into_options(self) -> OptionMap {
        self.values
    }
}

impl From<OptionMap> for SendParameters {
    fn from(values: OptionMap) -> Self {
        Self { values }
    }
}

// ============================================================================
// ReceiveParameters
// ============================================================================

/// Options applied when receiving messages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiveParameters {
    values: OptionMap,
}

impl ReceiveParameters {
    /// Create an empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an arbitrary parameter
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Restrict receives to one message class
    pub fn with_class_filter(mut self, class: impl Into<String>) -> Self {
        self.values
            .insert(CLASS_FILTER.to_string(), Value::String(class.into()));
        self
    }

    /// Class filter, if set
    pub fn class_filter(&self) -> Option<&str> {
        self.values.get(CLASS_FILTER).and_then(Value::as_str)
    }

    /// Raw parameter value
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Names of every parameter present
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    /// Check whether no parameters are set
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
#[path = "params_tests.rs"]
mod tests;
