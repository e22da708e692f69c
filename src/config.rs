//! Application configuration loaded from environment variables.
//!
//! Secrets arrive as environment variables (a `.env` file is honored for
//! local development) and are cached in memory for the process lifetime.

use std::env;
use std::str::FromStr;

/// Production WHOOP developer API base.
pub const DEFAULT_WHOOP_API_URL: &str = "https://api.prod.whoop.com/developer";
/// Production WHOOP OAuth base.
pub const DEFAULT_WHOOP_OAUTH_URL: &str = "https://api.prod.whoop.com/oauth";

const DEFAULT_SYNC_CONCURRENCY: usize = 4;

/// Which record store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(StoreBackend::Firestore),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::Invalid {
                name: "STORE_BACKEND",
                value: other.to_string(),
            }),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// WHOOP OAuth client ID (public)
    pub whoop_client_id: String,
    /// Redirect URL registered with WHOOP (points at `/whoop/callback`)
    pub whoop_redirect_url: String,
    /// WHOOP developer API base URL
    pub whoop_api_url: String,
    /// WHOOP OAuth base URL
    pub whoop_oauth_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Record store backend
    pub store_backend: StoreBackend,
    /// Server port
    pub port: u16,
    /// Max users synced in parallel by a team sync
    pub sync_concurrency: usize,
    /// Period of the background team sync, if enabled
    pub standup_sync_interval_secs: Option<u64>,

    // --- Secrets ---
    /// WHOOP OAuth client secret
    pub whoop_client_secret: String,
    /// Bearer token the chat host presents on `/api/*`
    pub host_api_token: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let store_backend = match env::var("STORE_BACKEND") {
            Ok(v) => v.parse()?,
            Err(_) => StoreBackend::Firestore,
        };

        Ok(Self {
            whoop_client_id: required("WHOOP_CLIENT_ID")?,
            whoop_redirect_url: required("WHOOP_REDIRECT_URL")?,
            whoop_api_url: env::var("WHOOP_API_URL")
                .unwrap_or_else(|_| DEFAULT_WHOOP_API_URL.to_string()),
            whoop_oauth_url: env::var("WHOOP_OAUTH_URL")
                .unwrap_or_else(|_| DEFAULT_WHOOP_OAUTH_URL.to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            store_backend,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            sync_concurrency: env::var("SYNC_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(DEFAULT_SYNC_CONCURRENCY)
                .max(1),
            standup_sync_interval_secs: env::var("STANDUP_SYNC_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|secs| *secs > 0),

            whoop_client_secret: required("WHOOP_CLIENT_SECRET")?,
            host_api_token: required("HOST_API_TOKEN")?,
        })
    }

    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            whoop_client_id: "test_client_id".to_string(),
            whoop_redirect_url: "http://localhost:8080/whoop/callback".to_string(),
            whoop_api_url: DEFAULT_WHOOP_API_URL.to_string(),
            whoop_oauth_url: DEFAULT_WHOOP_OAUTH_URL.to_string(),
            gcp_project_id: "test-project".to_string(),
            store_backend: StoreBackend::Memory,
            port: 8080,
            sync_concurrency: DEFAULT_SYNC_CONCURRENCY,
            standup_sync_interval_secs: None,
            whoop_client_secret: "test_secret".to_string(),
            host_api_token: "test_host_token".to_string(),
        }
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .map_err(|_| ConfigError::Missing(name))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}
