// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read models combining a user's latest metrics.

use serde::Serialize;

use super::{RecoveryRecord, SleepRecord, StrainRecord};

/// Most recent record of each metric type for one user.
///
/// A missing metric is `None`; it is never represented as a zero score.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LatestUserData {
    pub recovery: Option<RecoveryRecord>,
    pub sleep: Option<SleepRecord>,
    pub strain: Option<StrainRecord>,
}

impl LatestUserData {
    pub fn is_empty(&self) -> bool {
        self.recovery.is_none() && self.sleep.is_none() && self.strain.is_none()
    }
}

/// One connected team member with their latest metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamRow {
    pub user_id: String,
    pub display_name: Option<String>,
    pub latest: LatestUserData,
}

impl TeamRow {
    /// A row with no metrics yet (connected but never synced).
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: None,
            latest: LatestUserData::default(),
        }
    }

    /// Name to show in chat: profile name, else a mention of the user.
    pub fn display_label(&self) -> String {
        match self.display_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("<@{}>", self.user_id),
        }
    }
}
