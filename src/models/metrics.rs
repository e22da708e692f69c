//! Daily WHOOP metric records.
//!
//! Each record is unique per (user, date); storing a second record for the
//! same day replaces the first.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Milliseconds per hour, for duration display.
pub const MS_PER_HOUR: f64 = 3_600_000.0;

/// Daily recovery, keyed by the day the recovery was created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryRecord {
    pub user_id: String,
    pub whoop_user_id: String,
    pub date: NaiveDate,
    /// Recovery score (0-100)
    pub score: i32,
    /// Heart rate variability (RMSSD, ms)
    pub hrv_ms: f64,
    /// Resting heart rate (bpm)
    pub resting_hr: i32,
    pub ingested_at: DateTime<Utc>,
}

/// Nightly sleep, keyed by the day the sleep ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepRecord {
    pub user_id: String,
    pub whoop_user_id: String,
    pub date: NaiveDate,
    /// Light + deep + REM; awake time excluded
    pub duration_ms: i64,
    /// Sleep efficiency percentage (0-100)
    pub efficiency: f64,
    /// Sleep score (0-100), possibly estimated
    pub score: i32,
    pub deep_ms: i64,
    pub rem_ms: i64,
    pub light_ms: i64,
    pub wake_ms: i64,
    pub ingested_at: DateTime<Utc>,
}

impl SleepRecord {
    pub fn duration_hours(&self) -> f64 {
        self.duration_ms as f64 / MS_PER_HOUR
    }
}

/// Daily strain (WHOOP's 0-21 scale).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrainRecord {
    pub user_id: String,
    pub whoop_user_id: String,
    pub date: NaiveDate,
    pub score: f64,
    pub ingested_at: DateTime<Utc>,
}
