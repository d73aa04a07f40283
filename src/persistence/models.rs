//! Database models for persisted messages.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{ChatMessage, MessageId};

/// A stored row from the `messages` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredMessage {
    /// Auto-increment row ID; defines restore order.
    pub id: i64,
    /// Relay-assigned message id.
    pub message_id: Uuid,
    /// Room the message was posted to.
    pub room: String,
    /// Author display name at send time.
    pub author: String,
    /// Message body.
    pub content: String,
    /// Relay receipt timestamp.
    pub sent_at: DateTime<Utc>,
}

impl From<StoredMessage> for ChatMessage {
    fn from(row: StoredMessage) -> Self {
        Self {
            id: MessageId::from(row.message_id),
            author: row.author,
            content: row.content,
            timestamp: row.sent_at,
            room: row.room,
        }
    }
}
