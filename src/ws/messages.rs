//! WebSocket wire format: inbound client events and frame encoding.
//!
//! Frames are JSON objects tagged by an `event` field. Outbound events are
//! [`ServerEvent`]s; inbound ones are [`ClientEvent`]s. Aliases accept the
//! event names used by the browser panel (`get_rooms`, `change_username`).

use serde::Deserialize;

use crate::domain::ServerEvent;
use crate::error::RelayError;

/// Events a client can send.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Ask for the room list.
    #[serde(alias = "get_rooms")]
    RequestRoomList,

    /// Join (and create if needed) a room.
    JoinRoom {
        /// Room name, case-sensitive.
        room: String,
    },

    /// Post a message to the joined room.
    SendMessage {
        /// Message body.
        content: String,
        /// Room the client believes it is in. The joined room wins.
        #[serde(default)]
        room: Option<String>,
    },

    /// Change the client's display name.
    #[serde(alias = "change_username")]
    RequestRename {
        /// Proposed display name.
        #[serde(alias = "newUsername")]
        name: String,
    },
}

/// Decodes one text frame.
///
/// # Errors
///
/// Returns [`RelayError::MalformedEvent`] for invalid JSON or an unknown
/// event.
pub fn decode(text: &str) -> Result<ClientEvent, RelayError> {
    serde_json::from_str(text).map_err(|e| RelayError::MalformedEvent(e.to_string()))
}

/// Encodes one outbound event as a text frame.
///
/// # Errors
///
/// Returns [`RelayError::Internal`] if serialization fails.
pub fn encode(event: &ServerEvent) -> Result<String, RelayError> {
    serde_json::to_string(event).map_err(|e| RelayError::Internal(e.to_string()))
}
