//! WebSocket layer: connection handling, event decoding, protocol state.
//!
//! The WebSocket endpoint at `/ws` carries the relay protocol: room list
//! requests, joins, messages and renames in; room lists, history replays,
//! messages and rename notices out.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod state;
