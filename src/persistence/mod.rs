//! Persistence layer: PostgreSQL message journal.
//!
//! When enabled, every committed message flows through the
//! [`crate::domain::MessageJournal`] to a background [`writer::JournalWriter`]
//! that batches inserts into the `messages` table through the
//! [`sink::MessageSink`] seam. At startup the stored messages rebuild the
//! room store before connections are accepted.

pub mod models;
pub mod postgres;
pub mod sink;
pub mod writer;

pub use postgres::PostgresMessageStore;
pub use sink::{MessageSink, SaveError};
pub use writer::JournalWriter;
