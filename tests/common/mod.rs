// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use whoop_standup::config::Config;
use whoop_standup::db::{FirestoreDb, MemoryStore};
use whoop_standup::models::{Connection, RecoveryRecord, SleepRecord, StrainRecord};
use whoop_standup::routes::create_router;
use whoop_standup::services::{SyncEngine, WhoopClient};
use whoop_standup::AppState;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const API_PREFIX: &str = "/developer";
pub const OAUTH_PREFIX: &str = "/oauth";
pub const TOKEN_PATH: &str = "/oauth/oauth2/token";
pub const PROFILE_PATH: &str = "/developer/v1/user/profile/basic";
pub const RECOVERY_PATH: &str = "/developer/v1/recovery";
pub const SLEEP_PATH: &str = "/developer/v1/activity/sleep";
pub const WORKOUT_PATH: &str = "/developer/v1/activity/workout";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Test config pointing WHOOP at a mock server.
#[allow(dead_code)]
pub fn test_config(server: &MockServer) -> Config {
    Config {
        whoop_api_url: format!("{}{}", server.uri(), API_PREFIX),
        whoop_oauth_url: format!("{}{}", server.uri(), OAUTH_PREFIX),
        ..Config::test_default()
    }
}

/// Sync engine over a memory store, talking to a mock WHOOP.
#[allow(dead_code)]
pub fn test_engine(server: &MockServer, store: &MemoryStore) -> SyncEngine {
    let config = test_config(server);
    let client = WhoopClient::from_config(&config).expect("client");
    SyncEngine::new(client, Arc::new(store.clone()), config.sync_concurrency)
}

/// Create a test app over a memory store.
/// Returns the router, the shared state and the store.
#[allow(dead_code)]
pub fn create_test_app(server: &MockServer) -> (axum::Router, Arc<AppState>, MemoryStore) {
    let store = MemoryStore::new();
    let state = Arc::new(
        AppState::new(test_config(server), Arc::new(store.clone())).expect("app state"),
    );
    (create_router(state.clone()), state, store)
}

/// Bearer header value accepted by the host API in tests.
#[allow(dead_code)]
pub fn host_auth() -> String {
    format!("Bearer {}", Config::test_default().host_api_token)
}

// ─── Fixtures ────────────────────────────────────────────────

#[allow(dead_code)]
pub fn connection(user_id: &str, expires_at: DateTime<Utc>) -> Connection {
    Connection {
        user_id: user_id.to_string(),
        whoop_user_id: "10129".to_string(),
        display_name: Some(format!("{} Tester", user_id)),
        access_token: format!("access-{}", user_id),
        refresh_token: format!("refresh-{}", user_id),
        expires_at,
        connected_at: Utc::now() - Duration::days(7),
        active: true,
    }
}

/// A connection whose token is good for a day.
#[allow(dead_code)]
pub fn fresh_connection(user_id: &str) -> Connection {
    connection(user_id, Utc::now() + Duration::days(1))
}

#[allow(dead_code)]
pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[allow(dead_code)]
pub fn recovery(user_id: &str, date: NaiveDate, score: i32) -> RecoveryRecord {
    RecoveryRecord {
        user_id: user_id.to_string(),
        whoop_user_id: "10129".to_string(),
        date,
        score,
        hrv_ms: 45.5,
        resting_hr: 54,
        ingested_at: Utc::now(),
    }
}

#[allow(dead_code)]
pub fn sleep(user_id: &str, date: NaiveDate, score: i32, duration_ms: i64) -> SleepRecord {
    SleepRecord {
        user_id: user_id.to_string(),
        whoop_user_id: "10129".to_string(),
        date,
        duration_ms,
        efficiency: 91.0,
        score,
        deep_ms: duration_ms / 4,
        rem_ms: duration_ms / 4,
        light_ms: duration_ms / 2,
        wake_ms: 1_800_000,
        ingested_at: Utc::now(),
    }
}

#[allow(dead_code)]
pub fn strain(user_id: &str, date: NaiveDate, score: f64) -> StrainRecord {
    StrainRecord {
        user_id: user_id.to_string(),
        whoop_user_id: "10129".to_string(),
        date,
        score,
        ingested_at: Utc::now(),
    }
}

// ─── WHOOP wire bodies ───────────────────────────────────────

#[allow(dead_code)]
pub fn token_body(access: &str, refresh: &str) -> Value {
    json!({
        "access_token": access,
        "refresh_token": refresh,
        "expires_in": 3600,
        "scope": "offline read:recovery read:sleep read:profile read:workout",
        "token_type": "bearer"
    })
}

#[allow(dead_code)]
pub fn profile_body() -> Value {
    json!({
        "user_id": 10129,
        "email": "jane@example.com",
        "first_name": "Jane",
        "last_name": "Smith"
    })
}

#[allow(dead_code)]
pub fn page(records: Vec<Value>, next_token: Option<&str>) -> Value {
    json!({ "records": records, "next_token": next_token })
}

#[allow(dead_code)]
pub fn recovery_json(created_at: &str, score: f64) -> Value {
    json!({
        "cycle_id": 93845,
        "sleep_id": "ecfc6a15-4661-442f-a9a4-f160dd7afae8",
        "user_id": 10129,
        "created_at": created_at,
        "updated_at": created_at,
        "score_state": "SCORED",
        "score": {
            "user_calibrating": false,
            "recovery_score": score,
            "resting_heart_rate": 52.0,
            "hrv_rmssd_milli": 48.3,
            "spo2_percentage": 95.6875,
            "skin_temp_celsius": 33.7
        }
    })
}

#[allow(dead_code)]
pub fn sleep_json(start: &str, end: &str, sleep_score: i64, efficiency: f64) -> Value {
    json!({
        "id": "ecfc6a15-4661-442f-a9a4-f160dd7afae8",
        "user_id": 10129,
        "start": start,
        "end": end,
        "nap": false,
        "score_state": "SCORED",
        "score": {
            "stage_summary": {
                "total_in_bed_time_milli": 30272735,
                "total_awake_time_milli": 1403507,
                "total_light_sleep_time_milli": 14905851,
                "total_slow_wave_sleep_time_milli": 6630370,
                "total_rem_sleep_time_milli": 5879573
            },
            "sleep_efficiency_percentage": efficiency,
            "sleep_score": sleep_score
        }
    })
}

#[allow(dead_code)]
pub fn workout_json(start: &str, strain: f64) -> Value {
    json!({
        "id": "1043",
        "user_id": 10129,
        "start": start,
        "end": start,
        "sport_id": 1,
        "score_state": "SCORED",
        "score": { "strain": strain, "average_heart_rate": 123 }
    })
}

/// Respond to every data endpoint with an empty page.
#[allow(dead_code)]
pub async fn mount_empty_data(server: &MockServer) {
    for data_path in [RECOVERY_PATH, SLEEP_PATH, WORKOUT_PATH] {
        Mock::given(method("GET"))
            .and(path(data_path))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![], None)))
            .with_priority(10)
            .mount(server)
            .await;
    }
}
