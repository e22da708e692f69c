//! Record store layer (Firestore in production, in-memory for tests and local runs).

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::{
    Connection, LatestUserData, RecoveryRecord, SleepRecord, StrainRecord, TeamRow,
};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Collection names as constants.
pub mod collections {
    /// WHOOP connections (keyed by chat user ID)
    pub const CONNECTIONS: &str = "whoop_connections";
    /// Daily records (keyed by `{user_id}_{date}`)
    pub const RECOVERY: &str = "whoop_recovery";
    pub const SLEEP: &str = "whoop_sleep";
    pub const STRAIN: &str = "whoop_strain";
}

/// Document ID for a per-user daily record. One document per (user, date),
/// so writing the same day twice replaces the earlier record.
pub fn daily_doc_id(user_id: &str, date: NaiveDate) -> String {
    format!("{}_{}", urlencoding::encode(user_id), date.format("%Y-%m-%d"))
}

/// Persistence operations used by the sync engine and the formatter.
///
/// All writes are upserts: connections by user ID, metric records by
/// (user ID, date).
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn upsert_connection(&self, connection: &Connection) -> Result<(), AppError>;

    /// The user's connection, only if it is active.
    async fn get_active_connection(&self, user_id: &str) -> Result<Option<Connection>, AppError>;

    async fn list_active_connections(&self) -> Result<Vec<Connection>, AppError>;

    /// Clear the active flag. Tokens are kept.
    async fn deactivate_connection(&self, user_id: &str) -> Result<(), AppError>;

    /// Write `refreshed`'s access token, refresh token and expiry onto the
    /// stored connection, only if it is still active. Other fields are left
    /// alone. Returns `false` without writing when the connection is missing
    /// or inactive.
    async fn update_tokens(&self, refreshed: &Connection) -> Result<bool, AppError>;

    async fn upsert_recovery(&self, record: &RecoveryRecord) -> Result<(), AppError>;

    async fn get_latest_recovery(&self, user_id: &str)
        -> Result<Option<RecoveryRecord>, AppError>;

    async fn upsert_sleep(&self, record: &SleepRecord) -> Result<(), AppError>;

    async fn get_latest_sleep(&self, user_id: &str) -> Result<Option<SleepRecord>, AppError>;

    async fn upsert_strain(&self, record: &StrainRecord) -> Result<(), AppError>;

    async fn get_latest_strain(&self, user_id: &str) -> Result<Option<StrainRecord>, AppError>;

    /// One row per active connection with that user's latest metrics.
    /// Users with no metrics still get a row.
    async fn get_team_latest_rows(&self) -> Result<Vec<TeamRow>, AppError> {
        let mut connections = self.list_active_connections().await?;
        connections.sort_by(|a, b| a.user_id.cmp(&b.user_id));

        let mut rows = Vec::with_capacity(connections.len());
        for connection in connections {
            let latest = LatestUserData {
                recovery: self.get_latest_recovery(&connection.user_id).await?,
                sleep: self.get_latest_sleep(&connection.user_id).await?,
                strain: self.get_latest_strain(&connection.user_id).await?,
            };
            rows.push(TeamRow {
                user_id: connection.user_id,
                display_name: connection.display_name,
                latest,
            });
        }
        Ok(rows)
    }
}
