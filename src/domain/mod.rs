//! Domain layer: identifiers, messages, and the shared relay state.
//!
//! This module contains the connection registry, the room store with its
//! per-room histories and subscriber sets, the identity directory, and the
//! outbound event types queued to connections.

pub mod client_id;
pub mod connection_id;
pub mod connection_registry;
pub mod identity;
pub mod journal;
pub mod message;
pub mod outbox;
pub mod room_store;
pub mod server_event;

pub use client_id::ClientId;
pub use connection_id::ConnectionId;
pub use connection_registry::{ConnectionInfo, ConnectionRegistry, Departure};
pub use identity::{IdentityDirectory, UNKNOWN_DISPLAY_NAME};
pub use journal::MessageJournal;
pub use message::{ChatMessage, MessageId};
pub use outbox::{Delivery, Outbox, OutboxReceiver};
pub use room_store::{Room, RoomStore};
pub use server_event::ServerEvent;
