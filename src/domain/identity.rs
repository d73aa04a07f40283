//! Display names of attached clients.
//!
//! [`IdentityDirectory`] maps each [`ClientId`] with at least one live
//! connection to its current display name. Renames take the write lock on
//! the whole map, so the uniqueness check and the commit are one step.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::ClientId;
use crate::error::RenameError;

/// Placeholder used when the profile service supplies no name.
pub const UNKNOWN_DISPLAY_NAME: &str = "Unknown";

#[derive(Debug)]
struct IdentityEntry {
    display_name: String,
    /// Live connections of this client. The entry is dropped at zero.
    connections: usize,
}

/// Process-wide client → display name map.
#[derive(Debug)]
pub struct IdentityDirectory {
    entries: RwLock<HashMap<ClientId, IdentityEntry>>,
    max_name_len: usize,
}

impl IdentityDirectory {
    /// Creates an empty directory enforcing `max_name_len` characters on
    /// renames.
    #[must_use]
    pub fn new(max_name_len: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_name_len,
        }
    }

    /// Attaches one more connection of `client_id` and returns the name it
    /// now holds.
    ///
    /// A client that is already attached keeps its current name. Otherwise
    /// the supplied name is used, or [`UNKNOWN_DISPLAY_NAME`] when it is
    /// missing or blank.
    pub async fn attach(&self, client_id: &ClientId, supplied_name: Option<&str>) -> String {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(client_id) {
            entry.connections = entry.connections.saturating_add(1);
            return entry.display_name.clone();
        }
        let display_name = supplied_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(UNKNOWN_DISPLAY_NAME)
            .to_string();
        entries.insert(
            client_id.clone(),
            IdentityEntry {
                display_name: display_name.clone(),
                connections: 1,
            },
        );
        display_name
    }

    /// Detaches one connection of `client_id`.
    ///
    /// Returns `true` when that was the client's last connection and its
    /// name was released.
    pub async fn release(&self, client_id: &ClientId) -> bool {
        let mut entries = self.entries.write().await;
        let Some(entry) = entries.get_mut(client_id) else {
            return false;
        };
        entry.connections = entry.connections.saturating_sub(1);
        if entry.connections == 0 {
            entries.remove(client_id);
            return true;
        }
        false
    }

    /// Returns the client's current display name, or
    /// [`UNKNOWN_DISPLAY_NAME`] if it is not attached.
    pub async fn resolve(&self, client_id: &ClientId) -> String {
        self.entries
            .read()
            .await
            .get(client_id)
            .map_or_else(|| UNKNOWN_DISPLAY_NAME.to_string(), |e| e.display_name.clone())
    }

    /// Changes the client's display name.
    ///
    /// The proposed name is trimmed. Keeping one's own name succeeds.
    ///
    /// # Errors
    ///
    /// - [`RenameError::EmptyName`] if the name is blank.
    /// - [`RenameError::NameTooLong`] if it exceeds the configured length.
    /// - [`RenameError::NameTaken`] if another attached client holds it
    ///   (case-sensitive).
    /// - [`RenameError::UnknownClient`] if `client_id` is not attached.
    pub async fn rename(
        &self,
        client_id: &ClientId,
        proposed: &str,
    ) -> Result<String, RenameError> {
        let name = proposed.trim();
        if name.is_empty() {
            return Err(RenameError::EmptyName);
        }
        if name.chars().count() > self.max_name_len {
            return Err(RenameError::NameTooLong {
                max: self.max_name_len,
            });
        }

        let mut entries = self.entries.write().await;
        let taken = entries
            .iter()
            .any(|(other, entry)| other != client_id && entry.display_name == name);
        if taken {
            return Err(RenameError::NameTaken(name.to_string()));
        }
        let entry = entries
            .get_mut(client_id)
            .ok_or_else(|| RenameError::UnknownClient(client_id.clone()))?;
        entry.display_name = name.to_string();
        Ok(entry.display_name.clone())
    }

    /// Number of attached clients.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns `true` if no client is attached.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
