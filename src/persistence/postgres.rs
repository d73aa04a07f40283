//! PostgreSQL implementation of the message store.

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::models::StoredMessage;
use super::sink::{MessageSink, SaveError};
use crate::config::RelayConfig;
use crate::domain::ChatMessage;
use crate::error::RelayError;

const CREATE_MESSAGES_TABLE: &str = "\
CREATE TABLE IF NOT EXISTS messages (
    id          BIGSERIAL PRIMARY KEY,
    message_id  UUID NOT NULL UNIQUE,
    room        TEXT NOT NULL,
    author      TEXT NOT NULL,
    content     TEXT NOT NULL,
    sent_at     TIMESTAMPTZ NOT NULL
)";

const INSERT_MESSAGE: &str = "\
INSERT INTO messages (message_id, room, author, content, sent_at)
VALUES ($1, $2, $3, $4, $5)
ON CONFLICT (message_id) DO NOTHING";

/// PostgreSQL-backed message store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresMessageStore {
    pool: PgPool,
}

impl PostgresMessageStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool from the relay configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] if the database is unreachable.
    pub async fn connect(config: &RelayConfig) -> Result<Self, RelayError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Creates the `messages` table if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] on database failure.
    pub async fn ensure_schema(&self) -> Result<(), RelayError> {
        sqlx::query(CREATE_MESSAGES_TABLE)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Loads every stored message in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] on database failure.
    pub async fn load_all(&self) -> Result<Vec<ChatMessage>, RelayError> {
        let rows = sqlx::query_as::<_, StoredMessage>(
            "SELECT id, message_id, room, author, content, sent_at FROM messages ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ChatMessage::from).collect())
    }
}

/// Binds one message to [`INSERT_MESSAGE`].
fn insert(
    message: &ChatMessage,
) -> sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments> {
    sqlx::query(INSERT_MESSAGE)
        .bind(*message.id.as_uuid())
        .bind(&message.room)
        .bind(&message.author)
        .bind(&message.content)
        .bind(message.timestamp)
}

impl MessageSink for PostgresMessageStore {
    /// Inserts the batch in one transaction. Messages already stored
    /// (same `message_id`) are skipped, so a retried batch does not
    /// duplicate rows.
    async fn save_batch(&self, messages: &[ChatMessage]) -> Result<u64, SaveError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        for message in messages {
            inserted += insert(message).execute(&mut *tx).await?.rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    }

    async fn save_one(&self, message: &ChatMessage) -> Result<bool, SaveError> {
        let result = insert(message).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}
