// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! WHOOP connection (per-user OAuth credential) model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A team member's WHOOP OAuth credential.
///
/// Stored at `whoop_connections/{user_id}`. At most one per chat user;
/// disconnecting or a failed refresh clears `active` instead of deleting.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    /// Chat platform user ID (also the document ID)
    pub user_id: String,
    /// WHOOP user ID
    pub whoop_user_id: String,
    /// Name from the WHOOP profile, if shared
    #[serde(default)]
    pub display_name: Option<String>,
    pub access_token: String,
    pub refresh_token: String,
    /// When the access token expires
    pub expires_at: DateTime<Utc>,
    /// When the user (re)connected
    pub connected_at: DateTime<Utc>,
    pub active: bool,
}

impl Connection {
    /// True if the access token expires within `margin` of `now`.
    pub fn expires_within(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.expires_at - now <= margin
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("user_id", &self.user_id)
            .field("whoop_user_id", &self.whoop_user_id)
            .field("display_name", &self.display_name)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("connected_at", &self.connected_at)
            .field("active", &self.active)
            .finish()
    }
}
