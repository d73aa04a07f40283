//! Stable client identifier supplied by the authentication collaborator.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ConnectionId;

/// Identifier of a client as known to the profile service.
///
/// Opaque to the relay. A client may hold several connections at once, all
/// sharing one display name in the [`super::IdentityDirectory`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Wraps a client identifier string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Anonymous clients are identified by the connection that carried them.
impl From<ConnectionId> for ClientId {
    fn from(id: ConnectionId) -> Self {
        Self(id.to_string())
    }
}
