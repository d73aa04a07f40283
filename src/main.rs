//! room-relay server entry point.
//!
//! Starts the Axum HTTP server with the WebSocket relay and REST endpoints.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use room_relay::api::build_app;
use room_relay::app_state::AppState;
use room_relay::config::{LogFormat, RelayConfig};
use room_relay::domain::{MessageJournal, RoomStore};
use room_relay::persistence::{JournalWriter, PostgresMessageStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = RelayConfig::from_env().context("invalid LISTEN_ADDR")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(
        addr = %config.listen_addr,
        default_room = %config.default_room,
        "starting room-relay"
    );

    // Build domain layer, restoring history when persistence is on
    let mut rooms = RoomStore::new(config.default_room.clone());
    let mut writer = None;
    if config.persistence_enabled {
        let store = PostgresMessageStore::connect(&config)
            .await
            .context("connecting to message database")?;
        store.ensure_schema().await.context("creating messages table")?;

        let restored = rooms.restore(store.load_all().await?).await;
        tracing::info!(restored, rooms = rooms.len().await, "message history restored");

        let (journal, journal_rx) = MessageJournal::channel();
        rooms = rooms.with_journal(journal);
        writer = Some(JournalWriter::spawn(store, journal_rx, config.flush_interval()));
    }

    // Build application state and router
    let app_state = AppState::with_rooms(&config, Arc::new(rooms));
    let app = build_app(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(writer) = writer {
        writer.shutdown().await;
    }
    tracing::info!("room-relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
