//! Per-connection outbound queue.
//!
//! [`Outbox`] wraps the sending half of a bounded [`tokio::sync::mpsc`]
//! channel. Shared state (rooms, the registry) enqueues events with
//! [`Outbox::deliver`], which never waits, so no lock is ever held across
//! a socket write. The connection task drains the receiving half.
//!
//! A connection whose queue overflows has lost an event and its stream is
//! no longer gap-free. The outbox marks it lagged and the receiver ends
//! the stream at its next read, so the session closes and the client
//! reconnects for a fresh replay.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};

use super::ServerEvent;

/// Receiving half drained by the connection's socket writer.
#[derive(Debug)]
pub struct OutboxReceiver {
    receiver: mpsc::Receiver<Arc<ServerEvent>>,
    lagged: Arc<AtomicBool>,
}

impl OutboxReceiver {
    /// Receives the next event.
    ///
    /// Returns `None` when every sender is gone or once the connection has
    /// lagged.
    pub async fn recv(&mut self) -> Option<Arc<ServerEvent>> {
        if self.lagged.load(Ordering::Acquire) {
            return None;
        }
        self.receiver.recv().await
    }

    /// Receives the next event without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`TryRecvError::Empty`] when nothing is queued and
    /// [`TryRecvError::Disconnected`] when the stream has ended, including
    /// after a lag.
    pub fn try_recv(&mut self) -> Result<Arc<ServerEvent>, TryRecvError> {
        if self.lagged.load(Ordering::Acquire) {
            return Err(TryRecvError::Disconnected);
        }
        self.receiver.try_recv()
    }
}

/// Result of a single non-blocking delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The event was queued.
    Queued,
    /// The queue is full; the event was dropped and the connection is
    /// now lagged.
    Dropped,
    /// The connection is gone.
    Closed,
}

/// Cloneable handle for queueing events to one connection.
#[derive(Debug, Clone)]
pub struct Outbox {
    sender: mpsc::Sender<Arc<ServerEvent>>,
    lagged: Arc<AtomicBool>,
}

impl Outbox {
    /// Creates an outbox and its receiver with the given queue capacity.
    ///
    /// A zero capacity is raised to one.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, OutboxReceiver) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let lagged = Arc::new(AtomicBool::new(false));
        (
            Self {
                sender,
                lagged: Arc::clone(&lagged),
            },
            OutboxReceiver { receiver, lagged },
        )
    }

    /// Queues an event without waiting.
    ///
    /// A full queue drops the event and marks the connection lagged; once
    /// lagged, every later event is dropped too.
    pub fn deliver(&self, event: Arc<ServerEvent>) -> Delivery {
        if self.is_lagged() {
            return Delivery::Dropped;
        }
        match self.sender.try_send(event) {
            Ok(()) => Delivery::Queued,
            Err(TrySendError::Full(event)) => {
                self.lagged.store(true, Ordering::Release);
                tracing::warn!(
                    event = event.event_type_str(),
                    "outbound queue full, connection lagged"
                );
                Delivery::Dropped
            }
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    /// Returns `true` once an event has been dropped for this connection.
    #[must_use]
    pub fn is_lagged(&self) -> bool {
        self.lagged.load(Ordering::Acquire)
    }
}
