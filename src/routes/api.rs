// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Command API for the chat host.
//!
//! The host maps slash commands onto these endpoints and posts the returned
//! text; it never talks to WHOOP or the record store directly.

use crate::error::{AppError, Result};
use crate::models::TeamRow;
use crate::services::formatter::{compute_team_summary, format_team_standup, format_user_status};
use crate::services::{SyncAllSummary, SyncReport, TeamSummary};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// API routes (require the host bearer token).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/users/{user_id}/connect", get(connect_user))
        .route("/api/users/{user_id}/sync", post(sync_user))
        .route("/api/users/{user_id}/status", get(user_status))
        .route("/api/users/{user_id}/connection", delete(disconnect_user))
        .route("/api/sync", post(sync_all))
        .route("/api/team/standup", get(team_standup))
}

/// `?sync=true` runs a sync before reading.
#[derive(Debug, Default, Deserialize)]
pub struct SyncFirstParams {
    #[serde(default)]
    sync: bool,
}

/// Rendered message for the host to post.
#[derive(Debug, Serialize)]
pub struct TextResponse {
    pub text: String,
}

// ─── Per-User Commands ───────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub auth_url: String,
    pub already_connected: bool,
}

/// Authorization link for a user. Already-connected users still get a link
/// so they can reconnect.
async fn connect_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<ConnectResponse>> {
    let already_connected = state.sync.connection_status(&user_id).await?.is_some();
    let auth_url = state.sync.generate_auth_url(&user_id)?;

    tracing::info!(user_id = %user_id, already_connected, "Issued WHOOP authorization link");

    Ok(Json(ConnectResponse {
        auth_url,
        already_connected,
    }))
}

async fn sync_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<SyncReport>> {
    let report = state.sync.sync_user_data(&user_id).await?;
    Ok(Json(report))
}

/// Detailed status for one connected user.
async fn user_status(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(params): Query<SyncFirstParams>,
) -> Result<Json<TextResponse>> {
    let connection = state
        .sync
        .connection_status(&user_id)
        .await?
        .ok_or_else(|| AppError::NoConnection(user_id.clone()))?;

    if params.sync {
        state.sync.sync_user_data(&user_id).await?;
    }

    let row = TeamRow {
        latest: state.sync.get_latest_user_data(&user_id).await,
        display_name: connection.display_name,
        user_id,
    };

    Ok(Json(TextResponse {
        text: format_user_status(&row),
    }))
}

async fn disconnect_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<StatusCode> {
    state.sync.disconnect_user(&user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Team Commands ───────────────────────────────────────────

async fn sync_all(State(state): State<Arc<AppState>>) -> Json<SyncAllSummary> {
    Json(state.sync.sync_all_users_data().await)
}

#[derive(Debug, Serialize)]
pub struct StandupResponse {
    pub text: String,
    pub summary: TeamSummary,
    /// Users with an active connection
    pub connected: usize,
    /// Present when `?sync=true` was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncAllSummary>,
}

/// Team standup message built from the latest stored metrics.
async fn team_standup(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SyncFirstParams>,
) -> Result<Json<StandupResponse>> {
    let sync = if params.sync {
        Some(state.sync.sync_all_users_data().await)
    } else {
        None
    };

    let rows = state.sync.team_rows().await?;

    Ok(Json(StandupResponse {
        text: format_team_standup(&rows),
        summary: compute_team_summary(&rows),
        connected: rows.len(),
        sync,
    }))
}
