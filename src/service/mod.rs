//! Service layer: relay orchestration.
//!
//! [`RelayService`] is the single entry point the WebSocket and REST
//! layers call into.

pub mod relay_service;

pub use relay_service::{ConnectParams, JoinOutcome, RelayService, Session};
