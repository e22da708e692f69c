// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! WHOOP OAuth redirect handling.

use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::AppError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(info_page))
        .route("/whoop/callback", get(whoop_callback))
}

const CONNECTED_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>WHOOP Connected</title>
    <style>
        body { font-family: -apple-system, Arial, sans-serif; text-align: center; padding: 48px; }
        main { max-width: 520px; margin: 0 auto; }
        h1 { color: #1f9d55; }
    </style>
</head>
<body>
    <main>
        <h1>🎉 WHOOP Account Connected!</h1>
        <p>Your recovery, sleep and strain will now show up in the team's morning standup.</p>
        <p><strong>You can close this window and head back to Slack.</strong></p>
        <hr>
        <p><small>Try <code>/whoop-status</code> for your own stats or <code>/morning-report</code> for the team.</small></p>
    </main>
</body>
</html>"#;

const INFO_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>WHOOP Standup</title>
    <style>
        body { font-family: -apple-system, Arial, sans-serif; text-align: center; padding: 48px; }
        main { max-width: 520px; margin: 0 auto; }
    </style>
</head>
<body>
    <main>
        <h1>🤖 WHOOP Standup</h1>
        <p>This service receives WHOOP authorization redirects for the team chat bot.</p>
        <p>To link your account, run <code>/connect-whoop</code> in Slack.</p>
        <hr>
        <p><small>Landed here by accident? It is safe to close this page.</small></p>
    </main>
</body>
</html>"#;

/// Service info page.
async fn info_page() -> Html<&'static str> {
    Html(INFO_PAGE)
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    /// Set by WHOOP when the user denies access
    #[serde(default)]
    error: Option<String>,
}

/// OAuth redirect target: finish the connection and show a confirmation page.
async fn whoop_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let result = match params.into_code_and_state() {
        Ok((code, oauth_state)) => state.sync.complete_connection(&code, &oauth_state).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(connection) => {
            tracing::info!(user_id = %connection.user_id, "OAuth callback completed");
            Html(CONNECTED_PAGE).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "OAuth callback failed");
            (
                e.status_code(),
                format!("Failed to connect WHOOP account: {}", e),
            )
                .into_response()
        }
    }
}

impl CallbackParams {
    /// The authorization code and state, or why the redirect is unusable.
    fn into_code_and_state(self) -> Result<(String, String), AppError> {
        if let Some(error) = self.error {
            return Err(AppError::BadRequest(format!(
                "WHOOP authorization was not granted: {}",
                error
            )));
        }

        let code = self
            .code
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;
        let state = self
            .state
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::BadRequest("Missing state parameter".to_string()))?;

        Ok((code, state))
    }
}
