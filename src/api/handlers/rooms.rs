//! Read-only room handlers: list rooms, read history.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{RoomHistoryResponse, RoomListResponse, RoomSummaryDto};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, RelayError};

/// `GET /rooms` — List known rooms.
#[utoipa::path(
    get,
    path = "/api/v1/rooms",
    tag = "Rooms",
    summary = "List rooms",
    description = "Returns every known room, the default room first and the rest in creation order.",
    responses(
        (status = 200, description = "Room list", body = RoomListResponse),
    )
)]
pub async fn list_rooms(State(state): State<AppState>) -> impl IntoResponse {
    let rooms = state.relay_service.rooms();
    let default_room = rooms.default_room();

    let mut data = Vec::new();
    for name in rooms.list_rooms().await {
        // rooms are never deleted, so every listed name resolves
        let Some(room) = rooms.get(&name).await else {
            continue;
        };
        data.push(RoomSummaryDto {
            is_default: name == default_room,
            message_count: room.message_count().await,
            subscriber_count: room.subscriber_count().await,
            created_at: room.created_at(),
            name,
        });
    }

    Json(RoomListResponse { data })
}

/// `GET /rooms/{name}/messages` — Full history of a room.
///
/// # Errors
///
/// Returns [`RelayError::RoomNotFound`] if the room does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/rooms/{name}/messages",
    tag = "Rooms",
    summary = "Room history",
    description = "Returns the room's full message history in commit order.",
    params(
        ("name" = String, Path, description = "Room name (case-sensitive)"),
    ),
    responses(
        (status = 200, description = "Room history", body = RoomHistoryResponse),
        (status = 404, description = "Room not found", body = ErrorResponse),
    )
)]
pub async fn room_history(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, RelayError> {
    let room = state
        .relay_service
        .rooms()
        .get(&name)
        .await
        .ok_or_else(|| RelayError::RoomNotFound(name.clone()))?;

    Ok(Json(RoomHistoryResponse {
        room: name,
        messages: room.history().await,
    }))
}

/// Room routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/rooms", get(list_rooms))
        .route("/rooms/{name}/messages", get(room_history))
}
