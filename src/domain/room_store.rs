//! Room storage with per-room fine-grained locking.
//!
//! [`RoomStore`] keeps the room index behind a [`tokio::sync::RwLock`] and
//! each [`Room`]'s history and subscriber set behind the room's own
//! [`tokio::sync::Mutex`]. Appends, fan-out, subscribe and unsubscribe on
//! one room are serialized by that mutex; different rooms never contend.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};

use super::{ChatMessage, ConnectionId, Delivery, MessageJournal, Outbox, ServerEvent};
use crate::error::RelayError;

#[derive(Debug, Default)]
struct RoomState {
    history: Vec<ChatMessage>,
    subscribers: HashMap<ConnectionId, Outbox>,
}

/// A named channel: append-only history plus live subscribers.
#[derive(Debug)]
pub struct Room {
    name: String,
    created_at: DateTime<Utc>,
    state: Mutex<RoomState>,
}

impl Room {
    fn new(name: String) -> Self {
        Self {
            name,
            created_at: Utc::now(),
            state: Mutex::new(RoomState::default()),
        }
    }

    /// Room name (case-sensitive key).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// When the room was first created in this process.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns a copy of the full history in commit order.
    pub async fn history(&self) -> Vec<ChatMessage> {
        self.state.lock().await.history.clone()
    }

    /// Number of messages in the history.
    pub async fn message_count(&self) -> usize {
        self.state.lock().await.history.len()
    }

    /// Number of connections currently subscribed.
    pub async fn subscriber_count(&self) -> usize {
        self.state.lock().await.subscribers.len()
    }

    /// Subscribes a connection and queues its history replay.
    ///
    /// The `history_loaded` event is queued under the room lock, so every
    /// message committed afterwards reaches the connection after the
    /// replay and none is seen twice. Re-subscribing replaces the previous
    /// outbox. Returns the number of replayed messages.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Lagged`] if the replay could not be queued;
    /// the connection is then left unsubscribed.
    pub async fn subscribe(
        &self,
        connection_id: ConnectionId,
        outbox: Outbox,
    ) -> Result<usize, RelayError> {
        let mut state = self.state.lock().await;
        let replay = Arc::new(ServerEvent::HistoryLoaded {
            room: self.name.clone(),
            messages: state.history.clone(),
        });
        if outbox.deliver(replay) != Delivery::Queued {
            state.subscribers.remove(&connection_id);
            return Err(RelayError::Lagged(connection_id));
        }
        state.subscribers.insert(connection_id, outbox);
        Ok(state.history.len())
    }

    /// Removes a connection from the subscriber set.
    ///
    /// Returns `false` if it was not subscribed.
    pub async fn unsubscribe(&self, connection_id: ConnectionId) -> bool {
        self.state
            .lock()
            .await
            .subscribers
            .remove(&connection_id)
            .is_some()
    }

    /// Appends a message and fans it out to every subscriber.
    ///
    /// Append, journal record and fan-out happen under one lock
    /// acquisition, which defines both history order and broadcast order.
    /// Subscribers that cannot take the message are removed. Returns the
    /// subscriber set the message was queued to.
    async fn append(
        &self,
        message: ChatMessage,
        journal: Option<&MessageJournal>,
    ) -> Vec<ConnectionId> {
        let mut state = self.state.lock().await;
        if let Some(journal) = journal {
            journal.record(&message);
        }
        let event = Arc::new(ServerEvent::NewMessage {
            message: message.clone(),
        });
        state.history.push(message);

        let mut recipients = Vec::with_capacity(state.subscribers.len());
        state.subscribers.retain(|connection_id, outbox| {
            match outbox.deliver(Arc::clone(&event)) {
                Delivery::Queued => {
                    recipients.push(*connection_id);
                    true
                }
                Delivery::Dropped | Delivery::Closed => {
                    tracing::warn!(
                        %connection_id,
                        room = %self.name,
                        "subscriber dropped from room"
                    );
                    false
                }
            }
        });
        recipients
    }
}

#[derive(Debug, Default)]
struct RoomIndex {
    /// Creation order; the default room is always first.
    order: Vec<String>,
    rooms: HashMap<String, Arc<Room>>,
}

impl RoomIndex {
    fn insert(&mut self, name: &str) -> Arc<Room> {
        let room = Arc::new(Room::new(name.to_string()));
        self.order.push(name.to_string());
        self.rooms.insert(name.to_string(), Arc::clone(&room));
        room
    }
}

/// Central store for all known rooms.
///
/// Rooms are created lazily on first join and never deleted. The default
/// room exists from construction.
#[derive(Debug)]
pub struct RoomStore {
    default_room: String,
    index: RwLock<RoomIndex>,
    journal: Option<MessageJournal>,
}

impl RoomStore {
    /// Creates a store containing only the (empty) default room.
    #[must_use]
    pub fn new(default_room: impl Into<String>) -> Self {
        let default_room = default_room.into();
        let mut index = RoomIndex::default();
        index.insert(&default_room);
        Self {
            default_room,
            index: RwLock::new(index),
            journal: None,
        }
    }

    /// Attaches a journal that receives every committed message.
    #[must_use]
    pub fn with_journal(mut self, journal: MessageJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Name of the always-present room.
    #[must_use]
    pub fn default_room(&self) -> &str {
        &self.default_room
    }

    /// Lists room names: the default room first, then the rest in
    /// creation order.
    pub async fn list_rooms(&self) -> Vec<String> {
        self.index.read().await.order.clone()
    }

    /// Returns the room, creating it if needed.
    ///
    /// The boolean is `true` when this call created the room.
    pub async fn ensure_room(&self, name: &str) -> (Arc<Room>, bool) {
        if let Some(room) = self.get(name).await {
            return (room, false);
        }
        let mut index = self.index.write().await;
        // another join may have created it between the two locks
        if let Some(room) = index.rooms.get(name) {
            return (Arc::clone(room), false);
        }
        let room = index.insert(name);
        tracing::info!(room = name, "room created");
        (room, true)
    }

    /// Looks up an existing room.
    pub async fn get(&self, name: &str) -> Option<Arc<Room>> {
        self.index.read().await.rooms.get(name).cloned()
    }

    /// Returns the ordered history of a room; empty for unknown rooms.
    pub async fn history(&self, name: &str) -> Vec<ChatMessage> {
        match self.get(name).await {
            Some(room) => room.history().await,
            None => Vec::new(),
        }
    }

    /// Appends a message to `message.room` and fans it out.
    ///
    /// Returns the subscriber set the message was delivered to.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::RoomNotFound`] if the room was never created.
    pub async fn append(&self, message: ChatMessage) -> Result<Vec<ConnectionId>, RelayError> {
        let room = self
            .get(&message.room)
            .await
            .ok_or_else(|| RelayError::RoomNotFound(message.room.clone()))?;
        Ok(room.append(message, self.journal.as_ref()).await)
    }

    /// Rebuilds rooms and histories from previously persisted messages.
    ///
    /// Messages must be in commit order. Nothing is fanned out or
    /// journaled. Returns the number of restored messages.
    pub async fn restore(&self, messages: Vec<ChatMessage>) -> usize {
        let count = messages.len();
        for message in messages {
            let (room, _) = self.ensure_room(&message.room).await;
            room.state.lock().await.history.push(message);
        }
        count
    }

    /// Number of known rooms, default room included.
    pub async fn len(&self) -> usize {
        self.index.read().await.order.len()
    }

    /// Always `false`: the default room is never removed.
    pub async fn is_empty(&self) -> bool {
        self.index.read().await.order.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::domain::{ClientId, ConnectionRegistry};

    const DEFAULT: &str = "Dev Circle";

    #[tokio::test]
    async fn default_room_always_listed() {
        let store = RoomStore::new(DEFAULT);
        assert_eq!(store.list_rooms().await, vec![DEFAULT.to_string()]);
        assert!(store.history(DEFAULT).await.is_empty());
        assert!(!store.is_empty().await);
    }

    #[tokio::test]
    async fn rooms_listed_in_creation_order_after_default() {
        let store = RoomStore::new(DEFAULT);
        store.ensure_room("zeta").await;
        store.ensure_room("alpha").await;
        store.ensure_room(DEFAULT).await;
        assert_eq!(
            store.list_rooms().await,
            vec![DEFAULT.to_string(), "zeta".to_string(), "alpha".to_string()]
        );
    }

    #[tokio::test]
    async fn ensure_room_is_idempotent() {
        let store = RoomStore::new(DEFAULT);
        let (first, created) = store.ensure_room("general").await;
        assert!(created);
        let (second, created_again) = store.ensure_room("general").await;
        assert!(!created_again);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn room_names_are_case_sensitive() {
        let store = RoomStore::new(DEFAULT);
        store.ensure_room("General").await;
        store.ensure_room("general").await;
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn append_to_unknown_room_fails() {
        let store = RoomStore::new(DEFAULT);
        let result = store.append(ChatMessage::new("a", "hi", "nowhere")).await;
        assert!(matches!(result, Err(RelayError::RoomNotFound(_))));
        assert!(store.history("nowhere").await.is_empty());
    }

    #[tokio::test]
    async fn append_fans_out_to_subscribers() {
        let store = RoomStore::new(DEFAULT);
        let (room, _) = store.ensure_room(DEFAULT).await;
        let (outbox, mut rx) = Outbox::channel(8);
        let id = ConnectionId::new();
        assert_eq!(room.subscribe(id, outbox).await.ok(), Some(0));

        let Ok(recipients) = store.append(ChatMessage::new("a", "hi", DEFAULT)).await else {
            panic!("append failed");
        };
        assert_eq!(recipients, vec![id]);

        let Some(replay) = rx.recv().await else {
            panic!("expected history replay");
        };
        assert_eq!(replay.event_type_str(), "history_loaded");
        let Some(live) = rx.recv().await else {
            panic!("expected new message");
        };
        let ServerEvent::NewMessage { message } = live.as_ref() else {
            panic!("expected new_message, got {}", live.event_type_str());
        };
        assert_eq!(message.content, "hi");
    }

    #[tokio::test]
    async fn late_subscriber_gets_history_without_duplicates() {
        let store = RoomStore::new(DEFAULT);
        let (room, _) = store.ensure_room("general").await;
        for i in 0..3 {
            let _ = store
                .append(ChatMessage::new("a", format!("m{i}"), "general"))
                .await;
        }

        let (outbox, mut rx) = Outbox::channel(8);
        assert_eq!(room.subscribe(ConnectionId::new(), outbox).await.ok(), Some(3));
        let _ = store.append(ChatMessage::new("a", "m3", "general")).await;

        let Some(replay) = rx.recv().await else {
            panic!("expected replay");
        };
        let ServerEvent::HistoryLoaded { messages, .. } = replay.as_ref() else {
            panic!("expected history_loaded");
        };
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m0", "m1", "m2"]);

        let Some(live) = rx.recv().await else {
            panic!("expected live message");
        };
        let ServerEvent::NewMessage { message } = live.as_ref() else {
            panic!("expected new_message");
        };
        assert_eq!(message.content, "m3");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unsubscribed_connection_gets_nothing() {
        let store = RoomStore::new(DEFAULT);
        let (room, _) = store.ensure_room(DEFAULT).await;
        let (outbox, mut rx) = Outbox::channel(8);
        let id = ConnectionId::new();
        assert!(room.subscribe(id, outbox).await.is_ok());
        assert!(room.unsubscribe(id).await);
        assert!(!room.unsubscribe(id).await);

        let Ok(recipients) = store.append(ChatMessage::new("a", "hi", DEFAULT)).await else {
            panic!("append failed");
        };
        assert!(recipients.is_empty());
        let _ = rx.recv().await; // replay
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn replay_into_full_queue_fails_the_join() {
        let store = RoomStore::new(DEFAULT);
        let (room, _) = store.ensure_room("general").await;
        for i in 0..3 {
            let _ = store
                .append(ChatMessage::new("a", format!("m{i}"), "general"))
                .await;
        }

        let (outbox, mut rx) = Outbox::channel(1);
        let busy = Arc::new(ServerEvent::RoomList {
            rooms: vec![DEFAULT.to_string()],
        });
        assert_eq!(outbox.deliver(busy), Delivery::Queued);

        let id = ConnectionId::new();
        let Err(err) = room.subscribe(id, outbox).await else {
            panic!("replay into a full queue must fail");
        };
        assert!(matches!(err, RelayError::Lagged(failed) if failed == id));
        assert_eq!(room.subscriber_count().await, 0);

        let Ok(recipients) = store.append(ChatMessage::new("a", "m3", "general")).await else {
            panic!("append failed");
        };
        assert!(recipients.is_empty());
        // the session ends instead of continuing without its history
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn lagging_subscriber_is_removed_from_fan_out() {
        let store = RoomStore::new(DEFAULT);
        let (room, _) = store.ensure_room(DEFAULT).await;
        let (slow, mut slow_rx) = Outbox::channel(1);
        let (fast, mut fast_rx) = Outbox::channel(8);
        let slow_id = ConnectionId::new();
        let fast_id = ConnectionId::new();
        assert!(room.subscribe(slow_id, slow).await.is_ok());
        assert!(room.subscribe(fast_id, fast).await.is_ok());

        // slow never drains its replay, so the first message overflows it
        let Ok(recipients) = store.append(ChatMessage::new("a", "one", DEFAULT)).await else {
            panic!("append failed");
        };
        assert_eq!(recipients, vec![fast_id]);
        assert_eq!(room.subscriber_count().await, 1);

        let Ok(recipients) = store.append(ChatMessage::new("a", "two", DEFAULT)).await else {
            panic!("append failed");
        };
        assert_eq!(recipients, vec![fast_id]);
        assert!(slow_rx.recv().await.is_none());

        let mut live = Vec::new();
        while let Ok(event) = fast_rx.try_recv() {
            if let ServerEvent::NewMessage { message } = event.as_ref() {
                live.push(message.content.clone());
            }
        }
        assert_eq!(live, vec!["one".to_string(), "two".to_string()]);
    }

    #[tokio::test]
    async fn join_into_locked_room_does_not_block_registry() {
        let registry = Arc::new(ConnectionRegistry::new());
        let store = RoomStore::new(DEFAULT);
        let (room, _) = store.ensure_room("busy").await;
        let joiner = ConnectionId::new();
        let other = ConnectionId::new();
        let (outbox, _rx) = Outbox::channel(8);
        let (other_outbox, _other_rx) = Outbox::channel(8);
        registry.register(joiner, ClientId::from(joiner), outbox).await;
        registry.register(other, ClientId::from(other), other_outbox).await;

        let held = room.state.lock().await;
        let joining = {
            let registry = Arc::clone(&registry);
            let room = Arc::clone(&room);
            tokio::spawn(async move { registry.set_room(joiner, room).await })
        };
        tokio::task::yield_now().await;

        let info = tokio::time::timeout(Duration::from_millis(200), registry.info(other)).await;
        assert!(matches!(info, Ok(Ok(_))));

        drop(held);
        let Ok(Ok(replayed)) = joining.await else {
            panic!("join failed");
        };
        assert_eq!(replayed, 0);
        assert_eq!(room.subscriber_count().await, 1);
    }

    #[tokio::test]
    async fn concurrent_appends_keep_per_room_order() {
        let store = Arc::new(RoomStore::new(DEFAULT));
        store.ensure_room("a").await;
        store.ensure_room("b").await;

        let mut handles = Vec::new();
        for room in ["a", "b"] {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                for i in 0..50 {
                    let _ = store
                        .append(ChatMessage::new("w", i.to_string(), room))
                        .await;
                }
            }));
        }
        for handle in handles {
            let _ = handle.await;
        }

        for room in ["a", "b"] {
            let history = store.history(room).await;
            let seq: Vec<String> = history.iter().map(|m| m.content.clone()).collect();
            let expected: Vec<String> = (0..50).map(|i: i32| i.to_string()).collect();
            assert_eq!(seq, expected);
            assert!(history.iter().all(|m| m.room == room));
        }
    }

    #[tokio::test]
    async fn journal_sees_commit_order() {
        let (journal, mut rx) = MessageJournal::channel();
        let store = RoomStore::new(DEFAULT).with_journal(journal);
        for content in ["one", "two"] {
            let _ = store.append(ChatMessage::new("a", content, DEFAULT)).await;
        }
        let first = rx.recv().await.map(|m| m.content);
        let second = rx.recv().await.map(|m| m.content);
        assert_eq!(first.as_deref(), Some("one"));
        assert_eq!(second.as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn restore_rebuilds_rooms_in_order() {
        let store = RoomStore::new(DEFAULT);
        let restored = store
            .restore(vec![
                ChatMessage::new("a", "1", "ops"),
                ChatMessage::new("b", "2", DEFAULT),
                ChatMessage::new("a", "3", "ops"),
            ])
            .await;
        assert_eq!(restored, 3);
        assert_eq!(
            store.list_rooms().await,
            vec![DEFAULT.to_string(), "ops".to_string()]
        );
        let ops: Vec<String> = store
            .history("ops")
            .await
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(ops, vec!["1".to_string(), "3".to_string()]);
    }
}
