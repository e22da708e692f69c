// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! WHOOP connection lifecycle and data sync.
//!
//! `SyncEngine` is the only writer of connections and metric records after
//! the OAuth callback. It owns two policies:
//! - tokens are refreshed shortly before they expire, and a failed refresh
//!   deactivates the connection until the user reconnects
//! - each metric type syncs independently, and each user syncs independently
//!   during a team sync

use crate::db::RecordStore;
use crate::error::AppError;
use crate::models::{
    Connection, LatestUserData, RecoveryRecord, SleepRecord, StrainRecord, TeamRow, metrics::MS_PER_HOUR,
};
use crate::services::whoop::{ProviderRecovery, ProviderSleep, ProviderWorkout, WhoopClient};
use crate::time_utils::utc_day;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use dashmap::DashMap;
use futures_util::{stream, StreamExt};
use ring::rand::{SecureRandom, SystemRandom};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Refresh the access token when it expires within this many seconds.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60 * 60;

/// Each sync re-reads this many trailing days; WHOOP finalizes scores late
/// and users' local days straddle UTC midnight.
const SYNC_WINDOW_DAYS: i64 = 2;

/// Random bytes in the OAuth state nonce.
const STATE_NONCE_BYTES: usize = 16;

/// Shortest state string accepted from a callback.
const MIN_STATE_LEN: usize = 10;

/// Longest token lifetime accepted from WHOOP (30 days).
const MAX_TOKEN_LIFETIME_SECS: i64 = 30 * 24 * 60 * 60;

/// Per-user locks serializing token refresh within this process.
pub type RefreshLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Outcome of syncing one metric type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricSync {
    /// Number of daily records written
    Stored(usize),
    /// Fetch or persist failed; other metrics were still attempted
    Failed(String),
}

impl MetricSync {
    pub fn is_failed(&self) -> bool {
        matches!(self, MetricSync::Failed(_))
    }
}

/// Per-metric results of one user's sync.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncReport {
    pub user_id: String,
    pub recovery: MetricSync,
    pub sleep: MetricSync,
    pub strain: MetricSync,
}

impl SyncReport {
    pub fn fully_succeeded(&self) -> bool {
        !self.recovery.is_failed() && !self.sleep.is_failed() && !self.strain.is_failed()
    }
}

/// Counts from a team-wide sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncAllSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Connection lifecycle and sync orchestration.
#[derive(Clone)]
pub struct SyncEngine {
    client: WhoopClient,
    store: Arc<dyn RecordStore>,
    refresh_locks: RefreshLocks,
    sync_concurrency: usize,
}

impl SyncEngine {
    pub fn new(client: WhoopClient, store: Arc<dyn RecordStore>, sync_concurrency: usize) -> Self {
        Self {
            client,
            store,
            refresh_locks: Arc::new(DashMap::new()),
            sync_concurrency: sync_concurrency.max(1),
        }
    }

    // ─── OAuth ───────────────────────────────────────────────────────────────

    /// Authorization URL for `user_id`, with state `{user_id}:{hex nonce}`.
    pub fn generate_auth_url(&self, user_id: &str) -> Result<String, AppError> {
        if user_id.is_empty() || user_id.contains(':') {
            return Err(AppError::InvalidState(format!(
                "user id {:?} cannot be carried in OAuth state",
                user_id
            )));
        }

        let mut nonce = [0u8; STATE_NONCE_BYTES];
        SystemRandom::new()
            .fill(&mut nonce)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Failed to generate OAuth state")))?;

        let state = format!("{}:{}", user_id, hex::encode(nonce));
        Ok(self.client.authorization_url(&state))
    }

    /// Finish the OAuth flow: exchange the code, identify the WHOOP user and
    /// store an active connection. Reconnecting replaces the old connection.
    pub async fn complete_connection(
        &self,
        code: &str,
        state: &str,
    ) -> Result<Connection, AppError> {
        let user_id = parse_state(state)?;

        let grant = self.client.exchange_code(code).await?;
        let profile = self.client.get_profile(&grant.access_token).await?;

        let refresh_token = grant.refresh_token.unwrap_or_else(|| {
            tracing::warn!(user_id, "WHOOP token exchange returned no refresh token");
            String::new()
        });

        let now = Utc::now();
        let connection = Connection {
            user_id: user_id.to_string(),
            whoop_user_id: profile.whoop_user_id.clone(),
            display_name: profile.display_name(),
            access_token: grant.access_token,
            refresh_token,
            expires_at: token_expiry(now, grant.expires_in_secs),
            connected_at: now,
            active: true,
        };

        self.store.upsert_connection(&connection).await?;

        tracing::info!(
            user_id,
            whoop_user_id = %connection.whoop_user_id,
            "WHOOP account connected"
        );
        Ok(connection)
    }

    // ─── Token Management ────────────────────────────────────────────────────

    /// Return a connection whose access token is good for at least the
    /// refresh margin, refreshing it if needed.
    ///
    /// A failed refresh deactivates the connection before the error is
    /// returned, so later syncs report `NoConnection` instead of retrying a
    /// dead refresh token. A connection deactivated while the refresh is in
    /// flight stays deactivated; the new tokens are dropped and the result
    /// is `NoConnection`.
    pub async fn refresh_if_needed(&self, connection: Connection) -> Result<Connection, AppError> {
        let margin = Duration::seconds(TOKEN_REFRESH_MARGIN_SECS);
        if !connection.expires_within(Utc::now(), margin) {
            return Ok(connection);
        }

        let lock = self
            .refresh_locks
            .entry(connection.user_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Another task may have refreshed, or the user disconnected, while we waited
        let current = self
            .store
            .get_active_connection(&connection.user_id)
            .await?
            .ok_or_else(|| AppError::NoConnection(connection.user_id.clone()))?;
        if !current.expires_within(Utc::now(), margin) {
            tracing::debug!(user_id = %current.user_id, "Token already refreshed");
            return Ok(current);
        }

        let user_id = current.user_id.as_str();
        tracing::info!(user_id, expires_at = %current.expires_at, "Refreshing WHOOP token");

        let grant = match self.client.refresh_token(&current.refresh_token).await {
            Ok(grant) => grant,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Token refresh failed, deactivating connection");
                if let Err(de) = self.store.deactivate_connection(user_id).await {
                    tracing::error!(user_id, error = %de, "Failed to deactivate connection");
                }
                return Err(e);
            }
        };

        let refreshed = Connection {
            access_token: grant.access_token,
            refresh_token: grant
                .refresh_token
                .unwrap_or_else(|| current.refresh_token.clone()),
            expires_at: token_expiry(Utc::now(), grant.expires_in_secs),
            ..current
        };

        if !self.store.update_tokens(&refreshed).await? {
            tracing::info!(
                user_id = %refreshed.user_id,
                "Connection deactivated during refresh, new tokens discarded"
            );
            return Err(AppError::NoConnection(refreshed.user_id));
        }

        tracing::debug!(user_id = %refreshed.user_id, "WHOOP token refreshed");
        Ok(refreshed)
    }

    // ─── Sync ────────────────────────────────────────────────────────────────

    /// Sync the trailing window of recovery, sleep and strain for one user.
    ///
    /// Only a missing connection or a failed refresh is an error; metric
    /// failures are reported per metric in the returned `SyncReport`.
    pub async fn sync_user_data(&self, user_id: &str) -> Result<SyncReport, AppError> {
        let connection = self
            .store
            .get_active_connection(user_id)
            .await?
            .ok_or_else(|| AppError::NoConnection(user_id.to_string()))?;

        let connection = self.refresh_if_needed(connection).await?;

        let end = Utc::now();
        let start = end - Duration::days(SYNC_WINDOW_DAYS);

        let (recovery, sleep, strain) = tokio::join!(
            self.sync_recovery(&connection, start, end),
            self.sync_sleep(&connection, start, end),
            self.sync_strain(&connection, start, end),
        );

        let report = SyncReport {
            user_id: user_id.to_string(),
            recovery: metric_outcome(user_id, "recovery", recovery),
            sleep: metric_outcome(user_id, "sleep", sleep),
            strain: metric_outcome(user_id, "strain", strain),
        };

        tracing::info!(
            user_id,
            recovery = ?report.recovery,
            sleep = ?report.sleep,
            strain = ?report.strain,
            "User sync finished"
        );
        Ok(report)
    }

    /// Sync every active connection. Never fails; one user's failure does not
    /// affect any other user.
    pub async fn sync_all_users_data(&self) -> SyncAllSummary {
        let connections = match self.store.list_active_connections().await {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to list connections for team sync");
                return SyncAllSummary::default();
            }
        };

        let attempted = connections.len();
        let results: Vec<bool> = stream::iter(connections)
            .map(|connection| async move {
                match self.sync_user_data(&connection.user_id).await {
                    Ok(_) => true,
                    Err(e) => {
                        tracing::warn!(
                            user_id = %connection.user_id,
                            error = %e,
                            reconnect_required = e.is_reconnect_required(),
                            "User sync failed"
                        );
                        false
                    }
                }
            })
            .buffer_unordered(self.sync_concurrency)
            .collect()
            .await;

        let succeeded = results.iter().filter(|ok| **ok).count();
        let summary = SyncAllSummary {
            attempted,
            succeeded,
            failed: attempted - succeeded,
        };

        tracing::info!(
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Team sync finished"
        );
        summary
    }

    async fn sync_recovery(
        &self,
        connection: &Connection,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<usize, AppError> {
        let raw = self
            .client
            .get_recovery(&connection.access_token, start, end)
            .await?;

        let now = Utc::now();
        let records: Vec<RecoveryRecord> = raw
            .iter()
            .map(|r| recovery_record(connection, r, now))
            .collect();

        let mut stored = 0;
        let mut last_error = None;
        for record in &records {
            match self.store.upsert_recovery(record).await {
                Ok(()) => stored += 1,
                Err(e) => {
                    tracing::error!(user_id = %record.user_id, date = %record.date, error = %e, "Failed to store recovery");
                    last_error = Some(e);
                }
            }
        }
        persist_outcome(stored, last_error)
    }

    async fn sync_sleep(
        &self,
        connection: &Connection,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<usize, AppError> {
        let raw = self
            .client
            .get_sleep(&connection.access_token, start, end)
            .await?;

        let now = Utc::now();
        let records: Vec<SleepRecord> = raw
            .iter()
            .map(|s| sleep_record(connection, s, now))
            .collect();

        let mut stored = 0;
        let mut last_error = None;
        for record in &records {
            match self.store.upsert_sleep(record).await {
                Ok(()) => stored += 1,
                Err(e) => {
                    tracing::error!(user_id = %record.user_id, date = %record.date, error = %e, "Failed to store sleep");
                    last_error = Some(e);
                }
            }
        }
        persist_outcome(stored, last_error)
    }

    async fn sync_strain(
        &self,
        connection: &Connection,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<usize, AppError> {
        let workouts = self
            .client
            .get_workouts(&connection.access_token, start, end)
            .await?;

        let records = strain_records(connection, &workouts, Utc::now());

        let mut stored = 0;
        let mut last_error = None;
        for record in &records {
            match self.store.upsert_strain(record).await {
                Ok(()) => stored += 1,
                Err(e) => {
                    tracing::error!(user_id = %record.user_id, date = %record.date, error = %e, "Failed to store strain");
                    last_error = Some(e);
                }
            }
        }
        persist_outcome(stored, last_error)
    }

    // ─── Host Operations ─────────────────────────────────────────────────────

    /// Deactivate the user's connection. Tokens are kept on the record.
    pub async fn disconnect_user(&self, user_id: &str) -> Result<(), AppError> {
        if self.store.get_active_connection(user_id).await?.is_none() {
            return Err(AppError::NoConnection(user_id.to_string()));
        }
        self.store.deactivate_connection(user_id).await?;
        tracing::info!(user_id, "WHOOP account disconnected");
        Ok(())
    }

    /// Latest stored record of each metric. Read failures are logged and
    /// that metric is left out.
    pub async fn get_latest_user_data(&self, user_id: &str) -> LatestUserData {
        let (recovery, sleep, strain) = tokio::join!(
            self.store.get_latest_recovery(user_id),
            self.store.get_latest_sleep(user_id),
            self.store.get_latest_strain(user_id),
        );

        LatestUserData {
            recovery: best_effort(user_id, "recovery", recovery),
            sleep: best_effort(user_id, "sleep", sleep),
            strain: best_effort(user_id, "strain", strain),
        }
    }

    /// The user's active connection, if any.
    pub async fn connection_status(&self, user_id: &str) -> Result<Option<Connection>, AppError> {
        self.store.get_active_connection(user_id).await
    }

    /// Latest metrics for every connected user.
    pub async fn team_rows(&self) -> Result<Vec<TeamRow>, AppError> {
        self.store.get_team_latest_rows().await
    }
}

/// Recover the chat user ID from an OAuth state of the form `{user_id}:{nonce}`.
/// The first colon is the delimiter.
pub fn parse_state(state: &str) -> Result<&str, AppError> {
    if state.len() < MIN_STATE_LEN {
        return Err(AppError::InvalidState("state too short".to_string()));
    }

    match state.split_once(':') {
        Some((user_id, _)) if !user_id.is_empty() => Ok(user_id),
        Some(_) => Err(AppError::InvalidState("state has no user id".to_string())),
        None => Err(AppError::InvalidState("state has no delimiter".to_string())),
    }
}

/// Expiry for a token granted at `now` lasting `expires_in_secs`.
/// Out-of-range lifetimes are clamped to `[0, MAX_TOKEN_LIFETIME_SECS]`.
fn token_expiry(now: DateTime<Utc>, expires_in_secs: i64) -> DateTime<Utc> {
    now + Duration::seconds(expires_in_secs.clamp(0, MAX_TOKEN_LIFETIME_SECS))
}

/// Heuristic sleep score from duration and efficiency, used when WHOOP
/// reports none.
///
/// `efficiency_pct` is a percentage (0-100).
pub fn estimate_sleep_score(duration_ms: i64, efficiency_pct: f64) -> i32 {
    let efficiency = efficiency_pct / 100.0;
    let hours = duration_ms as f64 / MS_PER_HOUR;

    let score = if hours >= 7.5 && efficiency >= 0.85 {
        75.0 + (efficiency - 0.85) * 100.0
    } else if hours >= 6.5 && efficiency >= 0.75 {
        60.0 + (efficiency - 0.75) * 150.0
    } else {
        efficiency * 60.0
    };
    score as i32
}

/// The reported score, or an estimate if WHOOP reported 0 with a known efficiency.
pub fn resolve_sleep_score(reported: i32, duration_ms: i64, efficiency_pct: f64) -> i32 {
    if reported == 0 && efficiency_pct > 0.0 {
        estimate_sleep_score(duration_ms, efficiency_pct)
    } else {
        reported
    }
}

fn recovery_record(
    connection: &Connection,
    raw: &ProviderRecovery,
    now: DateTime<Utc>,
) -> RecoveryRecord {
    RecoveryRecord {
        user_id: connection.user_id.clone(),
        whoop_user_id: connection.whoop_user_id.clone(),
        date: utc_day(raw.created_at),
        score: raw.recovery_score as i32,
        hrv_ms: raw.hrv_rmssd_ms,
        resting_hr: raw.resting_heart_rate as i32,
        ingested_at: now,
    }
}

/// Sleep is attributed to the day it ends.
fn sleep_record(connection: &Connection, raw: &ProviderSleep, now: DateTime<Utc>) -> SleepRecord {
    let duration_ms = raw.light_ms + raw.deep_ms + raw.rem_ms;

    SleepRecord {
        user_id: connection.user_id.clone(),
        whoop_user_id: connection.whoop_user_id.clone(),
        date: utc_day(raw.end),
        duration_ms,
        efficiency: raw.efficiency_pct,
        score: resolve_sleep_score(raw.reported_score, duration_ms, raw.efficiency_pct),
        deep_ms: raw.deep_ms,
        rem_ms: raw.rem_ms,
        light_ms: raw.light_ms,
        wake_ms: raw.awake_ms,
        ingested_at: now,
    }
}

/// One strain record per workout start day, holding that day's highest strain.
fn strain_records(
    connection: &Connection,
    workouts: &[ProviderWorkout],
    now: DateTime<Utc>,
) -> Vec<StrainRecord> {
    let mut by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for workout in workouts {
        let day = by_day.entry(utc_day(workout.start)).or_insert(workout.strain);
        *day = day.max(workout.strain);
    }

    by_day
        .into_iter()
        .map(|(date, score)| StrainRecord {
            user_id: connection.user_id.clone(),
            whoop_user_id: connection.whoop_user_id.clone(),
            date,
            score,
            ingested_at: now,
        })
        .collect()
}

/// A metric counts as failed only if nothing could be stored.
fn persist_outcome(stored: usize, last_error: Option<AppError>) -> Result<usize, AppError> {
    match last_error {
        Some(e) if stored == 0 => Err(e),
        _ => Ok(stored),
    }
}

fn metric_outcome(user_id: &str, metric: &str, result: Result<usize, AppError>) -> MetricSync {
    match result {
        Ok(count) => MetricSync::Stored(count),
        Err(e) => {
            tracing::warn!(
                user_id,
                metric,
                error = %e,
                retryable = e.is_retryable(),
                "Metric sync failed"
            );
            MetricSync::Failed(e.to_string())
        }
    }
}

fn best_effort<T>(user_id: &str, metric: &str, result: Result<Option<T>, AppError>) -> Option<T> {
    result.unwrap_or_else(|e| {
        tracing::warn!(user_id, metric, error = %e, "Failed to read latest record");
        None
    })
}
