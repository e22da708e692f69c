// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

/// Failure reported by (or while talking to) the WHOOP API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamError {
    /// HTTP status, if a response was received at all
    pub status: Option<u16>,
    /// Response body, or the transport error text
    pub body: String,
    /// The request hit the client timeout
    pub timed_out: bool,
}

impl UpstreamError {
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            body: body.into(),
            timed_out: false,
        }
    }

    pub fn transport(err: &reqwest::Error) -> Self {
        Self {
            status: err.status().map(|s| s.as_u16()),
            body: err.to_string(),
            timed_out: err.is_timeout(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self {
            status: None,
            body: message.into(),
            timed_out: false,
        }
    }
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.status, self.timed_out) {
            (_, true) => write!(f, "request timed out: {}", self.body),
            (Some(status), false) => write!(f, "HTTP {}: {}", status, self.body),
            (None, false) => write!(f, "{}", self.body),
        }
    }
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("No active WHOOP connection for user {0}")]
    NoConnection(String),

    #[error("Invalid OAuth state: {0}")]
    InvalidState(String),

    #[error("WHOOP token exchange failed: {0}")]
    AuthExchangeFailed(UpstreamError),

    #[error("WHOOP token refresh failed: {0}")]
    TokenRefreshFailed(UpstreamError),

    #[error("WHOOP profile fetch failed: {0}")]
    ProfileFetchFailed(UpstreamError),

    #[error("WHOOP data fetch failed: {0}")]
    FetchFailed(UpstreamError),

    #[error("Failed to persist record: {0}")]
    PersistFailed(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// The user must run the OAuth flow again before any sync can succeed.
    pub fn is_reconnect_required(&self) -> bool {
        matches!(
            self,
            AppError::NoConnection(_) | AppError::TokenRefreshFailed(_)
        )
    }

    /// Transient upstream failure; the caller may try again later.
    pub fn is_retryable(&self) -> bool {
        match self.upstream() {
            Some(upstream) => {
                upstream.timed_out
                    || matches!(upstream.status, Some(429) | Some(500..=599))
            }
            None => false,
        }
    }

    /// Upstream details, for the provider-facing error kinds.
    pub fn upstream(&self) -> Option<&UpstreamError> {
        match self {
            AppError::AuthExchangeFailed(e)
            | AppError::TokenRefreshFailed(e)
            | AppError::ProfileFetchFailed(e)
            | AppError::FetchFailed(e) => Some(e),
            _ => None,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NoConnection(_) => StatusCode::NOT_FOUND,
            AppError::InvalidState(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::AuthExchangeFailed(_)
            | AppError::TokenRefreshFailed(_)
            | AppError::ProfileFetchFailed(_)
            | AppError::FetchFailed(_) => StatusCode::BAD_GATEWAY,
            AppError::PersistFailed(_) | AppError::Database(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (error, details) = match &self {
            AppError::NoConnection(user) => ("no_connection", Some(user.clone())),
            AppError::InvalidState(msg) => ("invalid_state", Some(msg.clone())),
            AppError::BadRequest(msg) => ("bad_request", Some(msg.clone())),
            AppError::Unauthorized => ("unauthorized", None),
            AppError::AuthExchangeFailed(e) => ("auth_exchange_failed", Some(e.to_string())),
            AppError::TokenRefreshFailed(e) => ("token_refresh_failed", Some(e.to_string())),
            AppError::ProfileFetchFailed(e) => ("profile_fetch_failed", Some(e.to_string())),
            AppError::FetchFailed(e) => ("whoop_error", Some(e.to_string())),
            AppError::PersistFailed(msg) => {
                tracing::error!(error = %msg, "Persist error");
                ("persist_failed", None)
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                ("database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                ("internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
