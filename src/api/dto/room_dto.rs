//! Room listing and history DTOs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::ChatMessage;

/// One entry of the room listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomSummaryDto {
    /// Room name.
    pub name: String,
    /// Whether this is the always-present default room.
    pub is_default: bool,
    /// Messages in the room's history.
    pub message_count: usize,
    /// Connections currently subscribed.
    pub subscriber_count: usize,
    /// When the room was created in this process.
    pub created_at: DateTime<Utc>,
}

/// Response for `GET /api/v1/rooms`.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomListResponse {
    /// Rooms, default room first, then creation order.
    pub data: Vec<RoomSummaryDto>,
}

/// Response for `GET /api/v1/rooms/{name}/messages`.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomHistoryResponse {
    /// Room name.
    pub room: String,
    /// Messages in commit order.
    pub messages: Vec<ChatMessage>,
}
