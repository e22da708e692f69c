// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod connection;
pub mod metrics;
pub mod team;

pub use connection::Connection;
pub use metrics::{RecoveryRecord, SleepRecord, StrainRecord};
pub use team::{LatestUserData, TeamRow};
