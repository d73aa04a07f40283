//! Chat messages as stored in room history.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Relay-assigned unique message identifier (UUID v4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct MessageId(uuid::Uuid);

impl MessageId {
    /// Creates a new random `MessageId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<uuid::Uuid> for MessageId {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}

/// One committed chat message.
///
/// Immutable once appended to a room. `author` is the sender's display
/// name at send time; later renames do not rewrite it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChatMessage {
    /// Unique message id.
    pub id: MessageId,
    /// Sender's display name when the message was committed.
    pub author: String,
    /// Message body, stored as received.
    pub content: String,
    /// Receipt time assigned by the relay.
    pub timestamp: DateTime<Utc>,
    /// Room the message was posted to.
    pub room: String,
}

impl ChatMessage {
    /// Builds a message stamped with the current time.
    #[must_use]
    pub fn new(
        author: impl Into<String>,
        content: impl Into<String>,
        room: impl Into<String>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            author: author.into(),
            content: content.into(),
            timestamp: Utc::now(),
            room: room.into(),
        }
    }
}
