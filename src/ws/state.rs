//! Per-connection protocol state.
//!
//! A connection starts `Unjoined` and moves to `Joined(room)` on its first
//! successful join. Later joins switch rooms; it never goes back to
//! `Unjoined` while connected.

/// Protocol state of a single WebSocket connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// Connected, no room joined yet.
    #[default]
    Unjoined,
    /// Subscribed to the named room.
    Joined(String),
}

impl ConnectionState {
    /// Records a successful join.
    pub fn join(&mut self, room: impl Into<String>) {
        *self = Self::Joined(room.into());
    }

    /// Returns the joined room, if any.
    #[must_use]
    pub fn room(&self) -> Option<&str> {
        match self {
            Self::Unjoined => None,
            Self::Joined(room) => Some(room),
        }
    }

    /// Returns `true` if `room` is set and differs from the joined room.
    #[must_use]
    pub fn mismatches(&self, room: Option<&str>) -> bool {
        match (self.room(), room) {
            (Some(joined), Some(claimed)) => joined != claimed,
            (None, Some(_)) => true,
            (_, None) => false,
        }
    }
}
