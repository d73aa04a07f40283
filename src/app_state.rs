//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::RelayConfig;
use crate::domain::{ConnectionRegistry, IdentityDirectory, RoomStore};
use crate::service::RelayService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Relay service for all protocol operations.
    pub relay_service: Arc<RelayService>,
    /// Capacity of each new connection's outbound queue.
    pub outbound_queue_capacity: usize,
}

impl AppState {
    /// Builds state around an existing room store.
    ///
    /// Registry and identity directory start empty.
    #[must_use]
    pub fn with_rooms(config: &RelayConfig, rooms: Arc<RoomStore>) -> Self {
        let relay_service = RelayService::new(
            Arc::new(ConnectionRegistry::new()),
            rooms,
            Arc::new(IdentityDirectory::new(config.max_name_len)),
            config.max_message_len,
        );
        Self {
            relay_service: Arc::new(relay_service),
            outbound_queue_capacity: config.outbound_queue_capacity,
        }
    }

    /// Builds a fresh in-memory relay.
    #[must_use]
    pub fn in_memory(config: &RelayConfig) -> Self {
        Self::with_rooms(config, Arc::new(RoomStore::new(config.default_room.clone())))
    }
}
