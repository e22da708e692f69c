// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! WHOOP Standup: team fitness summaries for a chat bot
//!
//! This crate connects team members' WHOOP accounts over OAuth, keeps
//! their recovery, sleep and strain data synced into a record store, and
//! renders team standup and per-user status messages for the chat host.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::RecordStore;
use error::AppError;
use services::{SyncEngine, WhoopClient};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub sync: SyncEngine,
}

impl AppState {
    /// Wire the WHOOP client and sync engine over `store`.
    pub fn new(config: Config, store: Arc<dyn RecordStore>) -> Result<Self, AppError> {
        let client = WhoopClient::from_config(&config)?;
        let sync = SyncEngine::new(client, store, config.sync_concurrency);
        Ok(Self { config, sync })
    }
}
