//! Background task that flushes the message journal to the store.
//!
//! Messages are batched and written every flush interval. A batch the
//! store rejects is retried row by row and the offending rows are dropped;
//! a batch that fails because the store is unreachable is kept for the
//! next tick, up to [`MAX_PENDING`] messages. Whatever is still queued
//! when the process dies is lost.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::sink::{MessageSink, SaveError};
use crate::domain::ChatMessage;

/// Upper bound on unsaved messages held while the store is unreachable.
/// The oldest are dropped beyond it.
pub const MAX_PENDING: usize = 50_000;

/// Handle to the running journal writer.
#[derive(Debug)]
pub struct JournalWriter {
    handle: JoinHandle<()>,
    shutdown: oneshot::Sender<()>,
}

impl JournalWriter {
    /// Spawns the writer draining `journal` into `sink`.
    #[must_use]
    pub fn spawn<S: MessageSink>(
        sink: S,
        journal: mpsc::UnboundedReceiver<ChatMessage>,
        flush_interval: Duration,
    ) -> Self {
        let (shutdown, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(run(sink, journal, flush_interval, shutdown_rx));
        Self { handle, shutdown }
    }

    /// Flushes what is queued and stops the writer.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(err) = self.handle.await {
            tracing::error!(error = %err, "journal writer task failed");
        }
    }
}

async fn run<S: MessageSink>(
    sink: S,
    mut journal: mpsc::UnboundedReceiver<ChatMessage>,
    flush_interval: Duration,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(flush_interval);
    let mut pending: Vec<ChatMessage> = Vec::new();

    loop {
        tokio::select! {
            message = journal.recv() => match message {
                Some(message) => enqueue(&mut pending, message),
                None => break,
            },
            _ = ticker.tick() => flush(&sink, &mut pending).await,
            _ = &mut shutdown => {
                while let Ok(message) = journal.try_recv() {
                    enqueue(&mut pending, message);
                }
                break;
            }
        }
    }

    flush(&sink, &mut pending).await;
    if !pending.is_empty() {
        tracing::error!(lost = pending.len(), "journal writer stopped with unflushed messages");
    }
}

fn enqueue(pending: &mut Vec<ChatMessage>, message: ChatMessage) {
    pending.push(message);
    if pending.len() > MAX_PENDING {
        let excess = pending.len() - MAX_PENDING;
        pending.drain(..excess);
        tracing::error!(dropped = excess, "journal backlog full, dropping oldest messages");
    }
}

/// Writes the pending batch and removes whatever is settled: saved rows
/// and rows the store refused.
async fn flush<S: MessageSink>(sink: &S, pending: &mut Vec<ChatMessage>) {
    if pending.is_empty() {
        return;
    }
    match sink.save_batch(pending).await {
        Ok(inserted) => {
            tracing::debug!(batch = pending.len(), inserted, "journal flushed");
            pending.clear();
        }
        Err(SaveError::Unavailable(err)) => {
            tracing::error!(
                batch = pending.len(),
                error = %err,
                "journal flush failed, will retry"
            );
        }
        Err(SaveError::Rejected(err)) => {
            tracing::warn!(
                batch = pending.len(),
                error = %err,
                "batch rejected, saving row by row"
            );
            save_rows(sink, pending).await;
        }
    }
}

async fn save_rows<S: MessageSink>(sink: &S, pending: &mut Vec<ChatMessage>) {
    let mut settled = 0;
    for message in pending.iter() {
        match sink.save_one(message).await {
            Ok(_) => {}
            Err(SaveError::Rejected(err)) => {
                tracing::error!(
                    message_id = %message.id,
                    room = %message.room,
                    error = %err,
                    "message rejected by store, dropping"
                );
            }
            Err(SaveError::Unavailable(err)) => {
                tracing::error!(error = %err, "journal flush interrupted, will retry");
                break;
            }
        }
        settled += 1;
    }
    pending.drain(..settled);
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// In-memory sink that refuses NUL bytes, like a PostgreSQL `TEXT`
    /// column, and can be switched offline.
    #[derive(Debug, Default, Clone)]
    struct MemorySink {
        saved: Arc<Mutex<Vec<String>>>,
        offline: Arc<Mutex<bool>>,
    }

    impl MemorySink {
        fn saved(&self) -> Vec<String> {
            self.saved.lock().map(|s| s.clone()).unwrap_or_default()
        }

        fn set_offline(&self, offline: bool) {
            if let Ok(mut flag) = self.offline.lock() {
                *flag = offline;
            }
        }

        fn check(&self, message: &ChatMessage) -> Result<(), SaveError> {
            if self.offline.lock().map(|f| *f).unwrap_or(true) {
                return Err(SaveError::Unavailable("connection refused".to_string()));
            }
            if message.content.contains('\0') {
                return Err(SaveError::Rejected("invalid byte sequence 0x00".to_string()));
            }
            Ok(())
        }

        fn store(&self, message: &ChatMessage) {
            if let Ok(mut saved) = self.saved.lock() {
                saved.push(message.content.clone());
            }
        }
    }

    impl MessageSink for MemorySink {
        async fn save_batch(&self, messages: &[ChatMessage]) -> Result<u64, SaveError> {
            for message in messages {
                self.check(message)?;
            }
            messages.iter().for_each(|m| self.store(m));
            Ok(messages.len() as u64)
        }

        async fn save_one(&self, message: &ChatMessage) -> Result<bool, SaveError> {
            self.check(message)?;
            self.store(message);
            Ok(true)
        }
    }

    fn batch(contents: &[&str]) -> Vec<ChatMessage> {
        contents
            .iter()
            .map(|c| ChatMessage::new("alice", *c, "Dev Circle"))
            .collect()
    }

    #[tokio::test]
    async fn rejected_row_is_dropped_and_the_rest_saved() {
        let sink = MemorySink::default();
        let mut pending = batch(&["before", "bad\0byte", "after"]);

        flush(&sink, &mut pending).await;
        assert!(pending.is_empty());
        assert_eq!(sink.saved(), vec!["before".to_string(), "after".to_string()]);

        // later batches are not blocked by the bad row
        let mut next = batch(&["later"]);
        flush(&sink, &mut next).await;
        assert!(next.is_empty());
        assert_eq!(sink.saved().len(), 3);
    }

    #[tokio::test]
    async fn unavailable_store_keeps_the_batch() {
        let sink = MemorySink::default();
        sink.set_offline(true);
        let mut pending = batch(&["one", "two"]);

        flush(&sink, &mut pending).await;
        assert_eq!(pending.len(), 2);
        assert!(sink.saved().is_empty());

        sink.set_offline(false);
        flush(&sink, &mut pending).await;
        assert!(pending.is_empty());
        assert_eq!(sink.saved(), vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn backlog_is_capped_dropping_oldest() {
        let mut pending = Vec::new();
        for i in 0..MAX_PENDING + 3 {
            enqueue(&mut pending, ChatMessage::new("a", i.to_string(), "Dev Circle"));
        }
        assert_eq!(pending.len(), MAX_PENDING);
        assert_eq!(pending.first().map(|m| m.content.as_str()), Some("3"));
    }

    #[tokio::test]
    async fn shutdown_flushes_queued_messages() {
        let sink = MemorySink::default();
        let (tx, rx) = mpsc::unbounded_channel();
        let writer = JournalWriter::spawn(sink.clone(), rx, Duration::from_secs(3600));
        for message in batch(&["x", "y"]) {
            let _ = tx.send(message);
        }
        writer.shutdown().await;
        assert_eq!(sink.saved(), vec!["x".to_string(), "y".to_string()]);
    }
}
