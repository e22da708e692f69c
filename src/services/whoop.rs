// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! WHOOP API client.
//!
//! Handles:
//! - Authorization URL construction
//! - Authorization-code exchange and token refresh
//! - Profile, recovery, sleep and workout fetches (following pagination)
//!
//! WHOOP's JSON shapes stay private to this module; callers only see the
//! flattened `Provider*` types below.

use crate::config::Config;
use crate::error::{AppError, UpstreamError};
use crate::time_utils::format_query_timestamp;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

/// Every request gives up after this long; callers decide whether to retry.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Scopes requested during authorization.
pub const OAUTH_SCOPES: &str = "read:recovery read:sleep read:profile read:workout";

/// Records requested per page (WHOOP's maximum).
const PAGE_SIZE: u32 = 25;

/// Upper bound on pages followed per fetch.
const MAX_PAGES: usize = 10;

const PROFILE_PATH: &str = "/v1/user/profile/basic";
const RECOVERY_PATH: &str = "/v1/recovery";
const SLEEP_PATH: &str = "/v1/activity/sleep";
const WORKOUT_PATH: &str = "/v1/activity/workout";

/// WHOOP API client. Holds only static configuration.
#[derive(Clone)]
pub struct WhoopClient {
    http: reqwest::Client,
    api_base_url: String,
    oauth_base_url: String,
    client_id: String,
    client_secret: String,
    redirect_url: String,
}

impl WhoopClient {
    /// Create a client against the given API and OAuth base URLs.
    pub fn new(
        client_id: String,
        client_secret: String,
        redirect_url: String,
        api_base_url: &str,
        oauth_base_url: &str,
    ) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            http,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            oauth_base_url: oauth_base_url.trim_end_matches('/').to_string(),
            client_id,
            client_secret,
            redirect_url,
        })
    }

    /// Create a client from application config.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::new(
            config.whoop_client_id.clone(),
            config.whoop_client_secret.clone(),
            config.whoop_redirect_url.clone(),
            &config.whoop_api_url,
            &config.whoop_oauth_url,
        )
    }

    fn token_url(&self) -> String {
        format!("{}/oauth2/token", self.oauth_base_url)
    }

    // ─── OAuth ───────────────────────────────────────────────────────────────

    /// Build the URL the user visits to authorize access.
    pub fn authorization_url(&self, state: &str) -> String {
        format!(
            "{}/oauth2/auth?\
             client_id={}&\
             redirect_uri={}&\
             response_type=code&\
             scope={}&\
             state={}",
            self.oauth_base_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_url),
            urlencoding::encode(OAUTH_SCOPES),
            urlencoding::encode(state),
        )
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenGrant, AppError> {
        let response = self
            .http
            .post(self.token_url())
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.redirect_url.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::AuthExchangeFailed(UpstreamError::transport(&e)))?;

        let token: WhoopTokenResponse =
            check_response_json(response, AppError::AuthExchangeFailed).await?;

        tracing::debug!(expires_in = token.expires_in, "WHOOP token exchange succeeded");
        Ok(token.into())
    }

    /// Trade a refresh token for a new access token.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenGrant, AppError> {
        let response = self
            .http
            .post(self.token_url())
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await
            .map_err(|e| AppError::TokenRefreshFailed(UpstreamError::transport(&e)))?;

        let token: WhoopTokenResponse =
            check_response_json(response, AppError::TokenRefreshFailed).await?;
        Ok(token.into())
    }

    // ─── Data ────────────────────────────────────────────────────────────────

    /// Get the authenticated user's basic profile.
    pub async fn get_profile(&self, access_token: &str) -> Result<ProviderProfile, AppError> {
        let url = format!("{}{}", self.api_base_url, PROFILE_PATH);
        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::ProfileFetchFailed(UpstreamError::transport(&e)))?;

        let profile: WhoopProfile =
            check_response_json(response, AppError::ProfileFetchFailed).await?;

        Ok(ProviderProfile {
            whoop_user_id: profile.user_id.to_string(),
            email: profile.email,
            first_name: profile.first_name.unwrap_or_default(),
            last_name: profile.last_name.unwrap_or_default(),
        })
    }

    /// Recovery records created within `[start, end]`. Unscored records are skipped.
    pub async fn get_recovery(
        &self,
        access_token: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ProviderRecovery>, AppError> {
        let records: Vec<WhoopRecovery> = self
            .get_collection(RECOVERY_PATH, access_token, start, end)
            .await?;

        Ok(records
            .into_iter()
            .filter_map(|r| {
                let score = r.score?;
                Some(ProviderRecovery {
                    whoop_user_id: r.user_id.to_string(),
                    created_at: r.created_at,
                    recovery_score: score.recovery_score,
                    hrv_rmssd_ms: score.hrv_rmssd_milli,
                    resting_heart_rate: score.resting_heart_rate,
                })
            })
            .collect())
    }

    /// Sleep sessions within `[start, end]`. Unscored sessions are skipped.
    pub async fn get_sleep(
        &self,
        access_token: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ProviderSleep>, AppError> {
        let records: Vec<WhoopSleep> = self
            .get_collection(SLEEP_PATH, access_token, start, end)
            .await?;

        Ok(records
            .into_iter()
            .filter_map(|s| {
                let score = s.score?;
                let stages = score.stage_summary;
                Some(ProviderSleep {
                    whoop_user_id: s.user_id.to_string(),
                    start: s.start,
                    end: s.end,
                    light_ms: stages.total_light_sleep_time_milli,
                    deep_ms: stages.total_slow_wave_sleep_time_milli,
                    rem_ms: stages.total_rem_sleep_time_milli,
                    awake_ms: stages.total_awake_time_milli,
                    efficiency_pct: score.sleep_efficiency_percentage,
                    reported_score: score.sleep_score,
                })
            })
            .collect())
    }

    /// Workouts within `[start, end]`. Workouts without a strain score are skipped.
    pub async fn get_workouts(
        &self,
        access_token: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ProviderWorkout>, AppError> {
        let records: Vec<WhoopWorkout> = self
            .get_collection(WORKOUT_PATH, access_token, start, end)
            .await?;

        Ok(records
            .into_iter()
            .filter_map(|w| {
                let strain = w.score?.strain?;
                Some(ProviderWorkout {
                    whoop_user_id: w.user_id.to_string(),
                    start: w.start,
                    end: w.end,
                    strain,
                })
            })
            .collect())
    }

    /// Fetch every page of a collection endpoint, following `next_token`.
    async fn get_collection<T: DeserializeOwned>(
        &self,
        path: &str,
        access_token: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<T>, AppError> {
        let url = format!("{}{}", self.api_base_url, path);
        let start = format_query_timestamp(start);
        let end = format_query_timestamp(end);

        let mut records = Vec::new();
        let mut next_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut query = vec![
                ("start", start.clone()),
                ("end", end.clone()),
                ("limit", PAGE_SIZE.to_string()),
            ];
            if let Some(token) = &next_token {
                query.push(("nextToken", token.clone()));
            }

            let response = self
                .http
                .get(&url)
                .bearer_auth(access_token)
                .query(&query)
                .send()
                .await
                .map_err(|e| AppError::FetchFailed(UpstreamError::transport(&e)))?;

            let page: WhoopPage<T> = check_response_json(response, AppError::FetchFailed).await?;
            records.extend(page.records);

            match page.next_token.filter(|t| !t.is_empty()) {
                Some(token) => next_token = Some(token),
                None => return Ok(records),
            }
        }

        tracing::warn!(
            path,
            pages = MAX_PAGES,
            "WHOOP pagination limit reached, remaining pages skipped"
        );
        Ok(records)
    }
}

/// Check response status and parse the JSON body, mapping failures with `kind`.
async fn check_response_json<T: DeserializeOwned>(
    response: reqwest::Response,
    kind: fn(UpstreamError) -> AppError,
) -> Result<T, AppError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();

        if status.as_u16() == 429 {
            tracing::warn!("WHOOP rate limit hit (429)");
        }

        return Err(kind(UpstreamError::http(status.as_u16(), body)));
    }

    response
        .json()
        .await
        .map_err(|e| kind(UpstreamError::decode(format!("JSON parse error: {}", e))))
}

// ─────────────────────────────────────────────────────────────────────────────
// Types handed to the rest of the crate
// ─────────────────────────────────────────────────────────────────────────────

/// Tokens granted by an exchange or refresh.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: String,
    /// WHOOP only issues one when the grant allows offline access
    pub refresh_token: Option<String>,
    pub expires_in_secs: i64,
    /// Sometimes included in the token response; the profile is authoritative
    pub whoop_user_id: Option<String>,
}

/// Basic WHOOP profile.
#[derive(Debug, Clone)]
pub struct ProviderProfile {
    pub whoop_user_id: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
}

impl ProviderProfile {
    /// "First Last", or `None` if WHOOP shared neither.
    pub fn display_name(&self) -> Option<String> {
        let name = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let name = name.trim();
        (!name.is_empty()).then(|| name.to_string())
    }
}

/// A scored recovery.
#[derive(Debug, Clone)]
pub struct ProviderRecovery {
    pub whoop_user_id: String,
    pub created_at: DateTime<Utc>,
    pub recovery_score: f64,
    pub hrv_rmssd_ms: f64,
    pub resting_heart_rate: f64,
}

/// A scored sleep session.
#[derive(Debug, Clone)]
pub struct ProviderSleep {
    pub whoop_user_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub light_ms: i64,
    pub deep_ms: i64,
    pub rem_ms: i64,
    pub awake_ms: i64,
    pub efficiency_pct: f64,
    /// 0 when WHOOP did not report one
    pub reported_score: i32,
}

/// A workout with a strain score.
#[derive(Debug, Clone)]
pub struct ProviderWorkout {
    pub whoop_user_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub strain: f64,
}

// ─────────────────────────────────────────────────────────────────────────────
// WHOOP wire format
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct WhoopTokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: i64,
    #[serde(default)]
    user_id: Option<serde_json::Value>,
}

impl From<WhoopTokenResponse> for TokenGrant {
    fn from(t: WhoopTokenResponse) -> Self {
        let whoop_user_id = t.user_id.and_then(|v| match v {
            serde_json::Value::String(s) if !s.is_empty() => Some(s),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        });

        Self {
            access_token: t.access_token,
            refresh_token: t.refresh_token.filter(|r| !r.is_empty()),
            expires_in_secs: t.expires_in,
            whoop_user_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WhoopPage<T> {
    #[serde(default = "Vec::new")]
    records: Vec<T>,
    #[serde(default)]
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WhoopProfile {
    user_id: i64,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WhoopRecovery {
    user_id: i64,
    created_at: DateTime<Utc>,
    score: Option<WhoopRecoveryScore>,
}

#[derive(Debug, Deserialize)]
struct WhoopRecoveryScore {
    recovery_score: f64,
    #[serde(default)]
    hrv_rmssd_milli: f64,
    #[serde(default)]
    resting_heart_rate: f64,
}

#[derive(Debug, Deserialize)]
struct WhoopSleep {
    user_id: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    score: Option<WhoopSleepScore>,
}

#[derive(Debug, Deserialize)]
struct WhoopSleepScore {
    #[serde(default)]
    stage_summary: WhoopStageSummary,
    #[serde(default)]
    sleep_efficiency_percentage: f64,
    #[serde(default)]
    sleep_score: i32,
}

#[derive(Debug, Default, Deserialize)]
struct WhoopStageSummary {
    #[serde(default)]
    total_awake_time_milli: i64,
    #[serde(default)]
    total_light_sleep_time_milli: i64,
    #[serde(default)]
    total_slow_wave_sleep_time_milli: i64,
    #[serde(default)]
    total_rem_sleep_time_milli: i64,
}

#[derive(Debug, Deserialize)]
struct WhoopWorkout {
    user_id: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    score: Option<WhoopWorkoutScore>,
}

#[derive(Debug, Deserialize)]
struct WhoopWorkoutScore {
    strain: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> WhoopClient {
        WhoopClient::new(
            "client id".to_string(),
            "secret".to_string(),
            "https://bot.example.com/whoop/callback".to_string(),
            "https://api.prod.whoop.com/developer/",
            "https://api.prod.whoop.com/oauth",
        )
        .unwrap()
    }

    #[test]
    fn test_authorization_url_contents() {
        let url = client().authorization_url("U123:abcdef");

        assert!(url.starts_with("https://api.prod.whoop.com/oauth/oauth2/auth?"));
        assert!(url.contains("client_id=client%20id"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fbot.example.com%2Fwhoop%2Fcallback"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("scope=read%3Arecovery%20read%3Asleep%20read%3Aprofile%20read%3Aworkout"));
        assert!(url.contains("state=U123%3Aabcdef"));
    }

    #[test]
    fn test_token_response_user_id_forms() {
        let numeric: WhoopTokenResponse = serde_json::from_str(
            r#"{"access_token":"a","refresh_token":"r","expires_in":3600,"user_id":1234}"#,
        )
        .unwrap();
        let grant = TokenGrant::from(numeric);
        assert_eq!(grant.whoop_user_id.as_deref(), Some("1234"));
        assert_eq!(grant.refresh_token.as_deref(), Some("r"));

        let empty: WhoopTokenResponse =
            serde_json::from_str(r#"{"access_token":"a","refresh_token":"","user_id":""}"#)
                .unwrap();
        let grant = TokenGrant::from(empty);
        assert_eq!(grant.whoop_user_id, None);
        assert_eq!(grant.refresh_token, None);
        assert_eq!(grant.expires_in_secs, 0);
    }

    #[test]
    fn test_profile_display_name() {
        let profile = ProviderProfile {
            whoop_user_id: "1".to_string(),
            email: None,
            first_name: "Ada".to_string(),
            last_name: " ".to_string(),
        };
        assert_eq!(profile.display_name().as_deref(), Some("Ada"));

        let anonymous = ProviderProfile {
            first_name: String::new(),
            last_name: String::new(),
            ..profile
        };
        assert_eq!(anonymous.display_name(), None);
    }
}
