//! Events pushed from the relay to connected clients.
//!
//! Every outbound frame is one [`ServerEvent`], serialized as a JSON
//! object whose `event` field names the variant.

use serde::{Deserialize, Serialize};

use super::{ChatMessage, ClientId, ConnectionId};

/// Outbound event delivered through a connection's [`super::Outbox`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerEvent {
    /// First event on every connection.
    Welcome {
        /// Id the relay assigned to this connection.
        connection_id: ConnectionId,
        /// Client identity bound to the connection.
        client_id: ClientId,
        /// Display name currently held by the client.
        display_name: String,
        /// The always-present room.
        default_room: String,
    },

    /// Known rooms, default room first.
    RoomList {
        /// Room names in listing order.
        rooms: Vec<String>,
    },

    /// Full history of a room, sent right after joining it.
    HistoryLoaded {
        /// Joined room.
        room: String,
        /// Messages in commit order.
        messages: Vec<ChatMessage>,
    },

    /// A message committed to the connection's current room.
    NewMessage {
        /// The committed message.
        message: ChatMessage,
    },

    /// A client changed display name. Sent to every connection.
    RenameApplied {
        /// Client that was renamed.
        client_id: ClientId,
        /// The new display name.
        display_name: String,
    },

    /// The requester's rename was refused.
    RenameRejected {
        /// Machine-readable reason (e.g. `"name_taken"`).
        reason: String,
        /// Human-readable explanation.
        message: String,
    },

    /// Any other client-input failure, unicast to the requester.
    Error {
        /// Numeric error code.
        code: u32,
        /// Human-readable explanation.
        message: String,
    },
}

impl ServerEvent {
    /// Returns the wire name of the event.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::Welcome { .. } => "welcome",
            Self::RoomList { .. } => "room_list",
            Self::HistoryLoaded { .. } => "history_loaded",
            Self::NewMessage { .. } => "new_message",
            Self::RenameApplied { .. } => "rename_applied",
            Self::RenameRejected { .. } => "rename_rejected",
            Self::Error { .. } => "error",
        }
    }
}
