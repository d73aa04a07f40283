//! Axum WebSocket upgrade handler.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::response::IntoResponse;

use super::connection::run_connection;
use crate::app_state::AppState;
use crate::service::ConnectParams;

/// `GET /ws?client_id=..&name=..` — Upgrade HTTP connection to WebSocket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let service = std::sync::Arc::clone(&state.relay_service);
    let capacity = state.outbound_queue_capacity;

    ws.on_upgrade(move |socket| run_connection(socket, service, params, capacity))
}
