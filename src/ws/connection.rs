//! WebSocket connection loop.
//!
//! Handles the read/write loop for a single WebSocket connection: decodes
//! client events and dispatches them to the [`RelayService`], and writes
//! queued [`ServerEvent`]s from the connection's outbox to the socket.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};

use super::messages::{ClientEvent, decode, encode};
use super::state::ConnectionState;
use crate::domain::{Outbox, ServerEvent};
use crate::error::RelayError;
use crate::service::{ConnectParams, RelayService, Session};

/// Runs one connection from registration to cleanup.
///
/// Cleanup runs whichever way the loop ends: close frame, transport
/// error, failed write, a lagged outbound queue or a fatal relay error.
pub async fn run_connection(
    socket: WebSocket,
    service: Arc<RelayService>,
    params: ConnectParams,
    queue_capacity: usize,
) {
    let (outbox, mut outbound_rx) = Outbox::channel(queue_capacity);
    let session = service.connect(params, outbox.clone()).await;
    let connection_id = session.connection_id;
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut state = ConnectionState::default();

    loop {
        tokio::select! {
            // Incoming frame from the client
            frame = ws_rx.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        let handled = handle_text(
                            &service,
                            &session,
                            &mut state,
                            &outbox,
                            text.as_str(),
                        )
                        .await;
                        if let Err(err) = handled {
                            tracing::error!(%connection_id, error = %err, "dropping connection");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        tracing::debug!(%connection_id, error = %err, "ws transport error");
                        break;
                    }
                    _ => {}
                }
            }
            // Event queued for this connection; the stream ends once it lags
            event = outbound_rx.recv() => {
                let Some(event) = event else {
                    tracing::warn!(%connection_id, "outbound stream ended, closing connection");
                    break;
                };
                match encode(&event) {
                    Ok(json) => {
                        if ws_tx.send(Message::text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        tracing::error!(%connection_id, error = %err, "failed to encode event");
                    }
                }
            }
        }
    }

    if let Err(err) = service.disconnect(connection_id).await {
        tracing::error!(%connection_id, error = %err, "connection cleanup failed");
    }
}

/// Decodes and dispatches one text frame.
///
/// Client-input errors are answered on the connection's own outbox and
/// swallowed; only fatal errors are returned.
async fn handle_text(
    service: &RelayService,
    session: &Session,
    state: &mut ConnectionState,
    outbox: &Outbox,
    text: &str,
) -> Result<(), RelayError> {
    let outcome = match decode(text) {
        Ok(event) => dispatch(service, session, state, outbox, event).await,
        Err(err) => Err(err),
    };
    match outcome {
        Ok(()) => Ok(()),
        Err(err) if err.is_fatal() => Err(err),
        Err(err) => {
            tracing::warn!(
                connection_id = %session.connection_id,
                code = err.error_code(),
                error = %err,
                "client request rejected"
            );
            outbox.deliver(Arc::new(err.to_event()));
            Ok(())
        }
    }
}

async fn dispatch(
    service: &RelayService,
    session: &Session,
    state: &mut ConnectionState,
    outbox: &Outbox,
    event: ClientEvent,
) -> Result<(), RelayError> {
    let connection_id = session.connection_id;
    match event {
        ClientEvent::RequestRoomList => {
            let rooms = service.list_rooms().await;
            outbox.deliver(Arc::new(ServerEvent::RoomList { rooms }));
        }
        ClientEvent::JoinRoom { room } => {
            let outcome = service.join(connection_id, &room).await?;
            state.join(outcome.room);
        }
        ClientEvent::SendMessage { content, room } => {
            if state.mismatches(room.as_deref()) {
                tracing::debug!(
                    %connection_id,
                    claimed = ?room,
                    joined = ?state.room(),
                    "send_message room differs from joined room"
                );
            }
            service.submit(connection_id, &content).await?;
        }
        ClientEvent::RequestRename { name } => {
            service.rename(connection_id, &name).await?;
        }
    }
    Ok(())
}
