// Message Domain Model

use crate::error::{QueueError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Message ID (UUID v4 in production)
pub type MessageId = String;

/// Opaque payload bytes.
///
/// Encoded as standard base64 inside the JSON envelope so that stored
/// messages stay readable by other producers sharing the same backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content(#[serde(with = "base64_bytes")] Vec<u8>);

impl Content {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Deserialize the payload as JSON into `T`
    pub fn bind_json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.0).map_err(QueueError::Bind)
    }
}

impl From<Vec<u8>> for Content {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Content {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<&str> for Content {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<String> for Content {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

/// Message Entity
///
/// Field order is part of the stored format: attempts, max_attempts, id, content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Message {
    attempts: u32,
    max_attempts: u32,
    id: MessageId,
    content: Content,
}

impl Message {
    /// Create a message with no retries allowed
    pub fn new(content: impl Into<Content>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// Create a message that may be requeued up to `max_attempts` times
    pub fn with_max_attempts(content: impl Into<Content>, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::new(content)
        }
    }

    /// Build a message from a serializable value (JSON payload)
    pub fn from_json<T: Serialize>(value: &T, max_attempts: u32) -> Result<Self> {
        let bytes = serde_json::to_vec(value).map_err(QueueError::Serialization)?;
        Ok(Self::with_max_attempts(bytes, max_attempts))
    }

    /// Set the message identity. Calling it again overwrites the previous ID.
    pub fn assign_id(&mut self, id: impl Into<MessageId>) {
        self.id = id.into();
    }

    pub fn set_content(&mut self, content: impl Into<Content>) {
        self.content = content.into();
    }

    pub fn set_max_attempts(&mut self, max_attempts: u32) {
        self.max_attempts = max_attempts;
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Record one more attempt (the ceiling is enforced by the queue).
    /// The counter saturates at `u32::MAX`.
    pub fn new_attempt(&mut self) {
        self.attempts = self.attempts.saturating_add(1);
    }

    /// True once the attempt counter went past the ceiling or saturated
    pub fn is_exhausted(&self) -> bool {
        self.attempts > self.max_attempts || self.attempts == u32::MAX
    }

    /// Serialize to the stored byte format
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(QueueError::Serialization)
    }

    /// Parse a message from its stored byte format
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(QueueError::Serialization)
    }

    /// Bind the payload to a typed target
    pub fn bind<T: DeserializeOwned>(&self) -> Result<T> {
        self.content.bind_json()
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    // `null` is accepted for payload-less messages
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(encoded) => STANDARD
                .decode(encoded.as_bytes())
                .map_err(serde::de::Error::custom),
            None => Ok(Vec::new()),
        }
    }
}
