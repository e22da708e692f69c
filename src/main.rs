// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! WHOOP Standup API Server
//!
//! Receives WHOOP OAuth redirects, keeps team members' WHOOP data synced,
//! and serves standup/status text to the chat host.

use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use whoop_standup::{
    config::{Config, StoreBackend},
    db::{FirestoreDb, MemoryStore, RecordStore},
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting WHOOP Standup API");

    let store: Arc<dyn RecordStore> = match config.store_backend {
        StoreBackend::Firestore => Arc::new(FirestoreDb::new(&config.gcp_project_id).await?),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory record store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let state = Arc::new(AppState::new(config.clone(), store)?);

    if let Some(secs) = config.standup_sync_interval_secs {
        spawn_periodic_sync(state.clone(), Duration::from_secs(secs));
    }

    // Build router
    let app = whoop_standup::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Run a team sync every `period`, starting after the first period elapses.
fn spawn_periodic_sync(state: Arc<AppState>, period: Duration) {
    tracing::info!(period_secs = period.as_secs(), "Periodic team sync enabled");

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        interval.tick().await; // first tick fires immediately

        loop {
            interval.tick().await;
            state.sync.sync_all_users_data().await;
        }
    });
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("whoop_standup=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
