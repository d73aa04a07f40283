//! Storage seam for the journal writer.

use std::future::Future;

use crate::domain::ChatMessage;

/// Why a save did not go through.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SaveError {
    /// The store refused the data itself; retrying the same rows fails
    /// again.
    #[error("rejected by store: {0}")]
    Rejected(String),

    /// The store could not be reached; the same rows may succeed later.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for SaveError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) => Self::Rejected(db.to_string()),
            other => Self::Unavailable(other.to_string()),
        }
    }
}

/// Durable destination for committed messages.
pub trait MessageSink: Send + Sync + 'static {
    /// Saves a batch atomically, in order. Returns the number of rows
    /// inserted; already stored messages are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError`] if nothing from the batch was saved.
    fn save_batch(
        &self,
        messages: &[ChatMessage],
    ) -> impl Future<Output = Result<u64, SaveError>> + Send;

    /// Saves a single message. Returns `false` if it was already stored.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError`] if the message was not saved.
    fn save_one(
        &self,
        message: &ChatMessage,
    ) -> impl Future<Output = Result<bool, SaveError>> + Send;
}
