//! Relay service: orchestrates connections, rooms and identities.

use std::sync::Arc;

use serde::Deserialize;

use crate::domain::{
    ChatMessage, ClientId, ConnectionId, ConnectionRegistry, IdentityDirectory, Outbox,
    RoomStore, ServerEvent,
};
use crate::error::{JoinError, RelayError, SubmitError};

/// Identity supplied by the profile service when a client connects.
///
/// Arrives as the query string of the WebSocket upgrade
/// (`/ws?client_id=42&name=alice`). Both fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectParams {
    /// Stable client identifier.
    pub client_id: Option<String>,
    /// Display name known to the profile service.
    pub name: Option<String>,
}

/// Identity of an established connection.
#[derive(Debug, Clone)]
pub struct Session {
    /// Relay-assigned connection id.
    pub connection_id: ConnectionId,
    /// Client the connection belongs to.
    pub client_id: ClientId,
    /// Display name at connect time.
    pub display_name: String,
}

/// Outcome of a successful join.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    /// Joined room.
    pub room: String,
    /// Number of messages replayed to the connection.
    pub replayed: usize,
    /// Whether the join created the room.
    pub created: bool,
}

/// Orchestration layer for every relay operation.
///
/// Owns handles to the [`ConnectionRegistry`], [`RoomStore`] and
/// [`IdentityDirectory`]. Each mutation takes only the locks it needs and
/// delivers through non-blocking outboxes, so no lock is held across
/// socket I/O.
#[derive(Debug, Clone)]
pub struct RelayService {
    registry: Arc<ConnectionRegistry>,
    rooms: Arc<RoomStore>,
    identities: Arc<IdentityDirectory>,
    max_message_len: usize,
}

impl RelayService {
    /// Creates a new `RelayService`.
    #[must_use]
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        rooms: Arc<RoomStore>,
        identities: Arc<IdentityDirectory>,
        max_message_len: usize,
    ) -> Self {
        Self {
            registry,
            rooms,
            identities,
            max_message_len,
        }
    }

    /// Returns a reference to the inner [`ConnectionRegistry`].
    #[must_use]
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Returns a reference to the inner [`RoomStore`].
    #[must_use]
    pub fn rooms(&self) -> &Arc<RoomStore> {
        &self.rooms
    }

    /// Returns a reference to the inner [`IdentityDirectory`].
    #[must_use]
    pub fn identities(&self) -> &Arc<IdentityDirectory> {
        &self.identities
    }

    /// Registers a new connection and queues its `welcome` event.
    ///
    /// Without a supplied client id the connection id stands in for it,
    /// making the client anonymous and unique. `welcome` is queued before
    /// the connection is registered, so it is always the first event.
    pub async fn connect(&self, params: ConnectParams, outbox: Outbox) -> Session {
        let connection_id = ConnectionId::new();
        let client_id = params
            .client_id
            .filter(|id| !id.trim().is_empty())
            .map_or_else(|| ClientId::from(connection_id), ClientId::new);
        let display_name = self
            .identities
            .attach(&client_id, params.name.as_deref())
            .await;

        outbox.deliver(Arc::new(ServerEvent::Welcome {
            connection_id,
            client_id: client_id.clone(),
            display_name: display_name.clone(),
            default_room: self.rooms.default_room().to_string(),
        }));
        self.registry
            .register(connection_id, client_id.clone(), outbox)
            .await;

        tracing::info!(%connection_id, %client_id, display_name, "connection registered");
        Session {
            connection_id,
            client_id,
            display_name,
        }
    }

    /// Returns the room list, default room first.
    pub async fn list_rooms(&self) -> Vec<String> {
        self.rooms.list_rooms().await
    }

    /// Joins `room_name`, creating it if needed.
    ///
    /// The connection leaves its previous room and gets a
    /// `history_loaded` replay. A newly created room triggers a
    /// `room_list` push to every connection.
    ///
    /// # Errors
    ///
    /// - [`JoinError::EmptyRoomName`] for a blank name.
    /// - [`RelayError::UnknownConnection`] for an unregistered id.
    /// - [`RelayError::Lagged`] if the history replay could not be queued.
    pub async fn join(
        &self,
        connection_id: ConnectionId,
        room_name: &str,
    ) -> Result<JoinOutcome, RelayError> {
        if room_name.trim().is_empty() {
            return Err(JoinError::EmptyRoomName.into());
        }
        let (room, created) = self.rooms.ensure_room(room_name).await;
        let replayed = self.registry.set_room(connection_id, room).await?;

        if created {
            let rooms = self.rooms.list_rooms().await;
            self.registry
                .broadcast(ServerEvent::RoomList { rooms })
                .await;
        }

        tracing::info!(%connection_id, room = room_name, replayed, created, "joined room");
        Ok(JoinOutcome {
            room: room_name.to_string(),
            replayed,
            created,
        })
    }

    /// Commits a message to the connection's current room and fans it out
    /// to every subscriber, sender included.
    ///
    /// # Errors
    ///
    /// - [`SubmitError::EmptyContent`] for blank content.
    /// - [`SubmitError::ContentTooLong`] above the configured length.
    /// - [`SubmitError::NoActiveRoom`] before any join.
    /// - [`RelayError::UnknownConnection`] for an unregistered id.
    pub async fn submit(
        &self,
        connection_id: ConnectionId,
        content: &str,
    ) -> Result<ChatMessage, RelayError> {
        if content.trim().is_empty() {
            return Err(SubmitError::EmptyContent.into());
        }
        if content.chars().count() > self.max_message_len {
            return Err(SubmitError::ContentTooLong {
                max: self.max_message_len,
            }
            .into());
        }

        let info = self.registry.info(connection_id).await?;
        let room = info.room.ok_or(SubmitError::NoActiveRoom)?;
        let author = self.identities.resolve(&info.client_id).await;

        let message = ChatMessage::new(author, content, room);
        let recipients = self.rooms.append(message.clone()).await?;

        tracing::debug!(
            %connection_id,
            room = %message.room,
            message_id = %message.id,
            recipients = recipients.len(),
            "message committed"
        );
        Ok(message)
    }

    /// Renames the connection's client and announces the new name to
    /// every connection.
    ///
    /// Rejections are returned to the caller only; nothing is broadcast.
    ///
    /// # Errors
    ///
    /// - [`crate::error::RenameError`] variants for refused names.
    /// - [`RelayError::UnknownConnection`] for an unregistered id.
    pub async fn rename(
        &self,
        connection_id: ConnectionId,
        proposed: &str,
    ) -> Result<String, RelayError> {
        let client_id = self.registry.info(connection_id).await?.client_id;
        let display_name = self.identities.rename(&client_id, proposed).await?;

        let offered = self
            .registry
            .broadcast(ServerEvent::RenameApplied {
                client_id: client_id.clone(),
                display_name: display_name.clone(),
            })
            .await;

        tracing::info!(%connection_id, %client_id, display_name, offered, "display name changed");
        Ok(display_name)
    }

    /// Removes a connection: leaves its room, drops its record and
    /// releases its identity claim.
    ///
    /// Runs for graceful and abrupt disconnects alike.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::UnknownConnection`] if the connection was
    /// already removed.
    pub async fn disconnect(&self, connection_id: ConnectionId) -> Result<(), RelayError> {
        let departure = self.registry.unregister(connection_id).await?;
        let released = self.identities.release(&departure.client_id).await;
        tracing::info!(
            %connection_id,
            room = ?departure.room,
            released,
            "connection closed"
        );
        Ok(())
    }

    /// Number of live connections.
    pub async fn connection_count(&self) -> usize {
        self.registry.len().await
    }
}
