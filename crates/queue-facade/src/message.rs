//! Message types for queue operations including core domain identifiers.

use crate::error::{QueueError, ValidationError};
use crate::params::OptionMap;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

// ============================================================================
// Core Domain Identifiers
// ============================================================================

/// Validated queue name with length and character restrictions
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QueueName(String);

impl QueueName {
    /// Create new queue name with validation
    pub fn new(name: String) -> Result<Self, ValidationError> {
        if name.is_empty() || name.len() > 260 {
            return Err(ValidationError::OutOfRange {
                field: "queue_name".to_string(),
                message: "must be 1-260 characters".to_string(),
            });
        }

        // Document stores and SQL tables both accept this set
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err(ValidationError::InvalidFormat {
                field: "queue_name".to_string(),
                message: "only ASCII alphanumeric, dots, hyphens, and underscores allowed"
                    .to_string(),
            });
        }

        if name.starts_with('-') || name.ends_with('-') || name.contains("--") {
            return Err(ValidationError::InvalidFormat {
                field: "queue_name".to_string(),
                message: "no leading/trailing hyphens or consecutive hyphens".to_string(),
            });
        }

        Ok(Self(name))
    }

    /// Get queue name as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QueueName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for QueueName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for QueueName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<QueueName> for String {
    fn from(name: QueueName) -> Self {
        name.0
    }
}

/// Unique identifier for messages within a backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    /// Generate new random message ID
    pub fn new() -> Self {
        let id = uuid::Uuid::new_v4();
        Self(id.to_string())
    }

    /// Get message ID as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ValidationError::Required {
                field: "message_id".to_string(),
            });
        }

        Ok(Self(s.to_string()))
    }
}

/// Opaque claim token marking a message as taken by one receiver
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClaimHandle(String);

impl ClaimHandle {
    /// Generate a fresh, unguessable claim token
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Get handle string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClaimHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ClaimHandle {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ValidationError::Required {
                field: "handle".to_string(),
            });
        }

        Ok(Self(s.to_string()))
    }
}

/// Timestamp wrapper for consistent time handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create timestamp for current time
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create timestamp from DateTime
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Get underlying DateTime
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Timestamp shifted by `duration`; `None` if the result is out of range
    pub fn checked_plus(&self, duration: Duration) -> Option<Self> {
        self.0.checked_add_signed(duration).map(Self)
    }

    /// Whether this point in time has been reached at `now`
    pub fn is_due(&self, now: Timestamp) -> bool {
        now >= *self
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S UTC"))
    }
}

impl FromStr for Timestamp {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let dt = s.parse::<DateTime<Utc>>()?;
        Ok(Self::from_datetime(dt))
    }
}

// ============================================================================
// Message Types
// ============================================================================

/// Application-owned metadata attached to an envelope
pub type Metadata = HashMap<String, serde_json::Value>;

/// Bookkeeping a queue attaches to an envelope once it has been sent or received
///
/// `handle` is `None` on the record produced by a send and carries the claim
/// token on the record produced by a receive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub handle: Option<ClaimHandle>,
    pub message_id: MessageId,
    pub queue_id: Option<String>,
    pub queue_name: QueueName,
    pub adapter: String,
    #[serde(default)]
    pub options: OptionMap,
}

/// A message travelling through a queue
///
/// The content is opaque to the facade. The delivery record is held as a
/// typed field and only merged into the metadata map by
/// [`Envelope::metadata_with_delivery`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(with = "bytes_serde")]
    content: Bytes,
    pub metadata: Metadata,
    pub class: Option<String>,
    #[serde(skip)]
    delivery: Option<DeliveryRecord>,
}

/// Custom serialization for Bytes
mod bytes_serde {
    use base64::{engine::general_purpose, Engine as _};
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let encoded = general_purpose::STANDARD.encode(bytes);
        encoded.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Bytes, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        let decoded = general_purpose::STANDARD
            .decode(encoded)
            .map_err(serde::de::Error::custom)?;
        Ok(Bytes::from(decoded))
    }
}

impl Envelope {
    /// Create new envelope with content
    pub fn new(content: impl Into<Bytes>) -> Self {
        Self {
            content: content.into(),
            metadata: Metadata::new(),
            class: None,
            delivery: None,
        }
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Set the message class label used by class filters
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    /// Message payload
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// Message payload as UTF-8, if it is valid UTF-8
    pub fn content_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }

    /// Delivery record, present once the envelope was sent or received
    pub fn delivery(&self) -> Option<&DeliveryRecord> {
        self.delivery.as_ref()
    }

    /// Replace the delivery record
    pub fn set_delivery(&mut self, record: DeliveryRecord) {
        self.delivery = Some(record);
    }

    /// Remove and return the delivery record
    pub fn take_delivery(&mut self) -> Option<DeliveryRecord> {
        self.delivery.take()
    }

    /// Mutable access to the delivery record
    pub fn delivery_mut(&mut self) -> Option<&mut DeliveryRecord> {
        self.delivery.as_mut()
    }

    /// Metadata map with the delivery record stored under `key`
    ///
    /// Any application entry already using `key` is overwritten.
    pub fn metadata_with_delivery(&self, key: &str) -> Result<Metadata, QueueError> {
        let mut metadata = self.metadata.clone();
        match &self.delivery {
            Some(record) => {
                metadata.insert(key.to_string(), serde_json::to_value(record)?);
            }
            None => {
                metadata.remove(key);
            }
        }
        Ok(metadata)
    }

    /// Rebuild an envelope from a flat metadata map, lifting the record at `key`
    pub fn from_metadata(
        content: impl Into<Bytes>,
        mut metadata: Metadata,
        key: &str,
    ) -> Result<Self, QueueError> {
        let delivery = match metadata.remove(key) {
            Some(serde_json::Value::Null) | None => None,
            Some(value) => Some(serde_json::from_value(value)?),
        };

        Ok(Self {
            content: content.into(),
            metadata,
            class: None,
            delivery,
        })
    }
}

impl From<&str> for Envelope {
    fn from(content: &str) -> Self {
        Self::new(content.to_string())
    }
}

impl From<String> for Envelope {
    fn from(content: String) -> Self {
        Self::new(content)
    }
}

impl From<Bytes> for Envelope {
    fn from(content: Bytes) -> Self {
        Self::new(content)
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
