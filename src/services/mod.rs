// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod formatter;
pub mod sync;
pub mod whoop;

pub use formatter::{compute_team_summary, TeamMood, TeamSummary};
pub use sync::{MetricSync, SyncAllSummary, SyncEngine, SyncReport};
pub use whoop::WhoopClient;
