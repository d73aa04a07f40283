//! Live connections and the room each one is subscribed to.
//!
//! [`ConnectionRegistry`] owns one record per connection behind a
//! [`tokio::sync::RwLock`]. The registry lock is released before any room
//! lock is awaited, so a join into a busy room never stalls the registry
//! for other rooms.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{ClientId, ConnectionId, Outbox, Room, ServerEvent};
use crate::error::RelayError;

#[derive(Debug)]
struct ConnectionEntry {
    client_id: ClientId,
    room: Option<Arc<Room>>,
    outbox: Outbox,
    connected_at: DateTime<Utc>,
}

/// Snapshot of one registered connection.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    /// Connection id.
    pub connection_id: ConnectionId,
    /// Client identity the connection belongs to.
    pub client_id: ClientId,
    /// Name of the subscribed room, if any.
    pub room: Option<String>,
    /// Registration time.
    pub connected_at: DateTime<Utc>,
}

/// What [`ConnectionRegistry::unregister`] removed.
#[derive(Debug, Clone)]
pub struct Departure {
    /// Client identity the connection carried.
    pub client_id: ClientId,
    /// Room it was subscribed to.
    pub room: Option<String>,
}

/// Registry of every live connection.
///
/// Operating on an id that is not registered is an invariant violation
/// and yields [`RelayError::UnknownConnection`].
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, ConnectionEntry>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes a connection visible to broadcasts.
    ///
    /// Anything the caller queued on `outbox` beforehand is ahead of every
    /// broadcast.
    pub async fn register(
        &self,
        connection_id: ConnectionId,
        client_id: ClientId,
        outbox: Outbox,
    ) {
        self.connections.write().await.insert(
            connection_id,
            ConnectionEntry {
                client_id,
                room: None,
                outbox,
                connected_at: Utc::now(),
            },
        );
    }

    /// Moves a connection's subscription to `room`.
    ///
    /// The new room is recorded under the registry lock; leaving the
    /// previous room (if different) and subscribing happen after that
    /// lock is released. Only the connection's own task changes its room,
    /// so the two steps never interleave with another move of the same
    /// connection. Joining the current room again replays its history.
    /// Returns the number of replayed messages.
    ///
    /// # Errors
    ///
    /// - [`RelayError::UnknownConnection`] for an unregistered id.
    /// - [`RelayError::Lagged`] if the replay could not be queued.
    pub async fn set_room(
        &self,
        connection_id: ConnectionId,
        room: Arc<Room>,
    ) -> Result<usize, RelayError> {
        let (previous, outbox) = {
            let mut connections = self.connections.write().await;
            let entry = connections
                .get_mut(&connection_id)
                .ok_or(RelayError::UnknownConnection(connection_id))?;
            let previous = entry.room.replace(Arc::clone(&room));
            (previous, entry.outbox.clone())
        };

        if let Some(previous) = previous
            && !Arc::ptr_eq(&previous, &room)
        {
            previous.unsubscribe(connection_id).await;
        }
        room.subscribe(connection_id, outbox).await
    }

    /// Removes a connection and its room membership.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::UnknownConnection`] for an unregistered id,
    /// including a second call for the same connection.
    pub async fn unregister(&self, connection_id: ConnectionId) -> Result<Departure, RelayError> {
        let entry = self
            .connections
            .write()
            .await
            .remove(&connection_id)
            .ok_or(RelayError::UnknownConnection(connection_id))?;
        let room = match entry.room {
            Some(room) => {
                room.unsubscribe(connection_id).await;
                Some(room.name().to_string())
            }
            None => None,
        };
        Ok(Departure {
            client_id: entry.client_id,
            room,
        })
    }

    /// Returns the room the connection is subscribed to, if any.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::UnknownConnection`] for an unregistered id.
    pub async fn current_room(
        &self,
        connection_id: ConnectionId,
    ) -> Result<Option<Arc<Room>>, RelayError> {
        self.connections
            .read()
            .await
            .get(&connection_id)
            .map(|entry| entry.room.clone())
            .ok_or(RelayError::UnknownConnection(connection_id))
    }

    /// Returns a snapshot of one connection.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::UnknownConnection`] for an unregistered id.
    pub async fn info(&self, connection_id: ConnectionId) -> Result<ConnectionInfo, RelayError> {
        self.connections
            .read()
            .await
            .get(&connection_id)
            .map(|entry| ConnectionInfo {
                connection_id,
                client_id: entry.client_id.clone(),
                room: entry.room.as_ref().map(|room| room.name().to_string()),
                connected_at: entry.connected_at,
            })
            .ok_or(RelayError::UnknownConnection(connection_id))
    }

    /// Queues an event to every registered connection.
    ///
    /// Returns the number of connections the event was offered to.
    pub async fn broadcast(&self, event: ServerEvent) -> usize {
        let event = Arc::new(event);
        let connections = self.connections.read().await;
        for entry in connections.values() {
            entry.outbox.deliver(Arc::clone(&event));
        }
        connections.len()
    }

    /// Number of live connections.
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Returns `true` if no connection is registered.
    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}
