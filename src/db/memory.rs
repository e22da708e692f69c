// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process record store.
//!
//! Same upsert semantics as the Firestore backend; used for local runs
//! (`STORE_BACKEND=memory`) and tests. Contents are lost on restart.

use crate::db::{daily_doc_id, RecordStore};
use crate::error::AppError;
use crate::models::{Connection, RecoveryRecord, SleepRecord, StrainRecord};
use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use std::sync::Arc;

/// DashMap-backed store. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    connections: Arc<DashMap<String, Connection>>,
    recovery: Arc<DashMap<String, RecoveryRecord>>,
    sleep: Arc<DashMap<String, SleepRecord>>,
    strain: Arc<DashMap<String, StrainRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored connection regardless of its active flag.
    pub fn connection(&self, user_id: &str) -> Option<Connection> {
        self.connections.get(user_id).map(|c| c.clone())
    }

    /// Number of stored recovery records for a user.
    pub fn recovery_count(&self, user_id: &str) -> usize {
        self.recovery
            .iter()
            .filter(|r| r.user_id == user_id)
            .count()
    }

    /// Number of stored sleep records for a user.
    pub fn sleep_count(&self, user_id: &str) -> usize {
        self.sleep.iter().filter(|r| r.user_id == user_id).count()
    }

    /// Number of stored strain records for a user.
    pub fn strain_count(&self, user_id: &str) -> usize {
        self.strain.iter().filter(|r| r.user_id == user_id).count()
    }
}

/// Latest record (by date) belonging to `user_id`.
fn latest_for<T: Clone>(
    map: &DashMap<String, T>,
    user_id: &str,
    owner: impl Fn(&T) -> (&str, NaiveDate),
) -> Option<T> {
    map.iter()
        .filter(|entry| owner(entry.value()).0 == user_id)
        .max_by_key(|entry| owner(entry.value()).1)
        .map(|entry| entry.value().clone())
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn upsert_connection(&self, connection: &Connection) -> Result<(), AppError> {
        self.connections
            .insert(connection.user_id.clone(), connection.clone());
        Ok(())
    }

    async fn get_active_connection(&self, user_id: &str) -> Result<Option<Connection>, AppError> {
        Ok(self
            .connections
            .get(user_id)
            .filter(|c| c.active)
            .map(|c| c.clone()))
    }

    async fn list_active_connections(&self) -> Result<Vec<Connection>, AppError> {
        Ok(self
            .connections
            .iter()
            .filter(|c| c.active)
            .map(|c| c.value().clone())
            .collect())
    }

    async fn deactivate_connection(&self, user_id: &str) -> Result<(), AppError> {
        if let Some(mut connection) = self.connections.get_mut(user_id) {
            connection.active = false;
        }
        Ok(())
    }

    async fn update_tokens(&self, refreshed: &Connection) -> Result<bool, AppError> {
        // The shard lock orders this against a concurrent deactivate
        match self.connections.get_mut(&refreshed.user_id) {
            Some(mut stored) if stored.active => {
                stored.access_token = refreshed.access_token.clone();
                stored.refresh_token = refreshed.refresh_token.clone();
                stored.expires_at = refreshed.expires_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn upsert_recovery(&self, record: &RecoveryRecord) -> Result<(), AppError> {
        self.recovery
            .insert(daily_doc_id(&record.user_id, record.date), record.clone());
        Ok(())
    }

    async fn get_latest_recovery(
        &self,
        user_id: &str,
    ) -> Result<Option<RecoveryRecord>, AppError> {
        Ok(latest_for(&self.recovery, user_id, |r| {
            (r.user_id.as_str(), r.date)
        }))
    }

    async fn upsert_sleep(&self, record: &SleepRecord) -> Result<(), AppError> {
        self.sleep
            .insert(daily_doc_id(&record.user_id, record.date), record.clone());
        Ok(())
    }

    async fn get_latest_sleep(&self, user_id: &str) -> Result<Option<SleepRecord>, AppError> {
        Ok(latest_for(&self.sleep, user_id, |r| {
            (r.user_id.as_str(), r.date)
        }))
    }

    async fn upsert_strain(&self, record: &StrainRecord) -> Result<(), AppError> {
        self.strain
            .insert(daily_doc_id(&record.user_id, record.date), record.clone());
        Ok(())
    }

    async fn get_latest_strain(&self, user_id: &str) -> Result<Option<StrainRecord>, AppError> {
        Ok(latest_for(&self.strain, user_id, |r| {
            (r.user_id.as_str(), r.date)
        }))
    }
}
