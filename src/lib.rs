//! # room-relay
//!
//! Realtime chat room relay for the browser chat panel.
//!
//! Clients hold a WebSocket to the relay, pick a room, get its history
//! replayed, post messages that are fanned out to everyone in the room,
//! and change display names that are announced to every connection.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket, HTTP)
//!     │
//!     ├── WS Handler (ws/)
//!     ├── REST Handlers (api/)
//!     │
//!     ├── RelayService (service/)
//!     │
//!     ├── ConnectionRegistry ─┐
//!     ├── RoomStore ──────────┤ (domain/)
//!     ├── IdentityDirectory ──┘
//!     │
//!     └── PostgreSQL message journal (persistence/, optional)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod ws;
