//! Commit-ordered feed of messages for the persistence writer.

use tokio::sync::mpsc;

use super::ChatMessage;

/// Sending side of the message journal.
///
/// [`super::RoomStore`] records each message while it still holds the
/// room lock, so the journal sees every room's messages in commit order.
/// Recording never waits.
#[derive(Debug, Clone)]
pub struct MessageJournal {
    sender: mpsc::UnboundedSender<ChatMessage>,
}

impl MessageJournal {
    /// Creates a journal and the receiver the writer drains.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ChatMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Records a committed message.
    pub fn record(&self, message: &ChatMessage) {
        if self.sender.send(message.clone()).is_err() {
            tracing::error!(
                message_id = %message.id,
                room = %message.room,
                "message journal closed, message not persisted"
            );
        }
    }
}
