//! Relay error types with event and HTTP status code mapping.
//!
//! Client-input failures are grouped per operation ([`SubmitError`],
//! [`RenameError`], [`JoinError`]) and wrapped by the central
//! [`RelayError`]. Every variant has a numeric code; over WebSocket it is
//! reported as a unicast event, over REST as a JSON error body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{ClientId, ConnectionId, ServerEvent};

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2004,
///     "message": "room not found: lobby"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
}

/// Why a `send_message` was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    /// Content is empty or whitespace only.
    #[error("message content is empty")]
    EmptyContent,

    /// Content exceeds the configured length.
    #[error("message content exceeds {max} characters")]
    ContentTooLong {
        /// Configured maximum, in characters.
        max: usize,
    },

    /// The connection has not joined a room.
    #[error("join a room before sending messages")]
    NoActiveRoom,
}

/// Why a `request_rename` was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenameError {
    /// Proposed name is empty or whitespace only.
    #[error("display name cannot be empty")]
    EmptyName,

    /// Proposed name exceeds the configured length.
    #[error("display name exceeds {max} characters")]
    NameTooLong {
        /// Configured maximum, in characters.
        max: usize,
    },

    /// Another attached client already holds the name.
    #[error("display name already taken: {0}")]
    NameTaken(String),

    /// The requesting client has no attached identity.
    #[error("no identity attached for client {0}")]
    UnknownClient(ClientId),
}

impl RenameError {
    /// Machine-readable reason carried by `rename_rejected`.
    #[must_use]
    pub const fn reason_code(&self) -> &'static str {
        match self {
            Self::EmptyName => "empty_name",
            Self::NameTooLong { .. } => "name_too_long",
            Self::NameTaken(_) => "name_taken",
            Self::UnknownClient(_) => "unknown_client",
        }
    }
}

/// Why a `join_room` was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    /// Room name is empty or whitespace only.
    #[error("room name cannot be empty")]
    EmptyRoomName,
}

/// Central relay error.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                  |
/// |-----------|-----------------|------------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request              |
/// | 2000–2999 | State/Conflict  | 404 Not Found / 409 Conflict |
/// | 3000–3999 | Server          | 500 / 503                    |
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// `send_message` was refused.
    #[error(transparent)]
    Submit(#[from] SubmitError),

    /// `request_rename` was refused.
    #[error(transparent)]
    Rename(#[from] RenameError),

    /// `join_room` was refused.
    #[error(transparent)]
    Join(#[from] JoinError),

    /// Inbound frame could not be decoded.
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    /// Room with the given name does not exist.
    #[error("room not found: {0}")]
    RoomNotFound(String),

    /// Operation on a connection that is not registered.
    #[error("unknown connection: {0}")]
    UnknownConnection(ConnectionId),

    /// The connection's outbound queue overflowed and it missed an event.
    #[error("connection {0} fell behind its outbound queue")]
    Lagged(ConnectionId),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::MalformedEvent(_) => 1000,
            Self::Submit(SubmitError::EmptyContent) => 1001,
            Self::Submit(SubmitError::ContentTooLong { .. }) => 1002,
            Self::Join(JoinError::EmptyRoomName) => 1003,
            Self::Rename(RenameError::EmptyName) => 1004,
            Self::Rename(RenameError::NameTooLong { .. }) => 1005,
            Self::Submit(SubmitError::NoActiveRoom) => 2001,
            Self::Rename(RenameError::NameTaken(_)) => 2002,
            Self::Rename(RenameError::UnknownClient(_)) => 2003,
            Self::RoomNotFound(_) => 2004,
            Self::Internal(_) => 3000,
            Self::Persistence(_) => 3001,
            Self::UnknownConnection(_) => 3002,
            Self::Lagged(_) => 3003,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedEvent(_)
            | Self::Join(_)
            | Self::Submit(SubmitError::EmptyContent | SubmitError::ContentTooLong { .. })
            | Self::Rename(RenameError::EmptyName | RenameError::NameTooLong { .. }) => {
                StatusCode::BAD_REQUEST
            }
            Self::RoomNotFound(_) | Self::Rename(RenameError::UnknownClient(_)) => {
                StatusCode::NOT_FOUND
            }
            Self::Submit(SubmitError::NoActiveRoom) | Self::Rename(RenameError::NameTaken(_)) => {
                StatusCode::CONFLICT
            }
            Self::Lagged(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::UnknownConnection(_) | Self::Persistence(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns `true` if the error ends the connection's session.
    ///
    /// Invariant violations and lagging connections are fatal; every
    /// client-input error is reported back and the session continues.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::UnknownConnection(_) | Self::Lagged(_))
    }

    /// Converts the error into the unicast event sent to the requester.
    #[must_use]
    pub fn to_event(&self) -> ServerEvent {
        match self {
            Self::Rename(err) => ServerEvent::RenameRejected {
                reason: err.reason_code().to_string(),
                message: err.to_string(),
            },
            other => ServerEvent::Error {
                code: other.error_code(),
                message: other.to_string(),
            },
        }
    }
}

impl From<sqlx::Error> for RelayError {
    fn from(err: sqlx::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
