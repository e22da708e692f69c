// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Connections (WHOOP OAuth credentials, one document per chat user)
//! - Recovery, sleep and strain records (one document per user per day)

use crate::db::{collections, daily_doc_id, RecordStore};
use crate::error::AppError;
use crate::models::{Connection, RecoveryRecord, SleepRecord, StrainRecord};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // The emulator takes an unauthenticated connection
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── Helper Methods ────────────────────────────────────────────

    /// Write a whole document, replacing any existing one.
    async fn put<T>(&self, collection: &str, doc_id: &str, object: &T) -> Result<(), AppError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collection)
            .document_id(doc_id)
            .object(object)
            .execute()
            .await
            .map_err(|e| AppError::PersistFailed(format!("{}/{}: {}", collection, doc_id, e)))?;
        Ok(())
    }

    /// Most recent document (by `date`) in a per-user daily collection.
    async fn latest_for_user<T>(&self, collection: &str, user_id: &str) -> Result<Option<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        let records: Vec<T> = self
            .get_client()?
            .fluent()
            .select()
            .from(collection)
            .filter(|q| q.for_all([q.field("user_id").eq(user_id)]))
            .order_by([("date", firestore::FirestoreQueryDirection::Descending)])
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(records.into_iter().next())
    }

    fn connection_doc_id(user_id: &str) -> String {
        urlencoding::encode(user_id).into_owned()
    }
}

#[async_trait]
impl RecordStore for FirestoreDb {
    // ─── Connection Operations ───────────────────────────────────

    async fn upsert_connection(&self, connection: &Connection) -> Result<(), AppError> {
        self.put(
            collections::CONNECTIONS,
            &Self::connection_doc_id(&connection.user_id),
            connection,
        )
        .await
    }

    async fn get_active_connection(&self, user_id: &str) -> Result<Option<Connection>, AppError> {
        let connection: Option<Connection> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::CONNECTIONS)
            .obj()
            .one(&Self::connection_doc_id(user_id))
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(connection.filter(|c| c.active))
    }

    async fn list_active_connections(&self) -> Result<Vec<Connection>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::CONNECTIONS)
            .filter(|q| q.for_all([q.field("active").eq(true)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn deactivate_connection(&self, user_id: &str) -> Result<(), AppError> {
        // Read-modify-write keeps the tokens on the document
        let existing: Option<Connection> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::CONNECTIONS)
            .obj()
            .one(&Self::connection_doc_id(user_id))
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let Some(mut connection) = existing else {
            return Ok(());
        };
        if !connection.active {
            return Ok(());
        }

        connection.active = false;
        self.upsert_connection(&connection).await?;
        tracing::info!(user_id, "WHOOP connection deactivated");
        Ok(())
    }

    async fn update_tokens(&self, refreshed: &Connection) -> Result<bool, AppError> {
        let client = self.get_client()?;
        let doc_id = Self::connection_doc_id(&refreshed.user_id);

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let stored: Option<Connection> = client
            .fluent()
            .select()
            .by_id_in(collections::CONNECTIONS)
            .obj()
            .one(&doc_id)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to read connection in transaction: {}", e))
            })?;

        // Disconnected while the refresh was in flight
        if !stored.is_some_and(|c| c.active) {
            let _ = transaction.rollback().await;
            return Ok(false);
        }

        // Only the token fields; `active` is never written here
        client
            .fluent()
            .update()
            .fields(firestore::paths!(Connection::{
                access_token,
                refresh_token,
                expires_at
            }))
            .in_col(collections::CONNECTIONS)
            .document_id(&doc_id)
            .object(refreshed)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::PersistFailed(format!("Failed to add token update to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::PersistFailed(format!("Transaction commit failed: {}", e)))?;

        Ok(true)
    }

    // ─── Daily Record Operations ─────────────────────────────────

    async fn upsert_recovery(&self, record: &RecoveryRecord) -> Result<(), AppError> {
        self.put(
            collections::RECOVERY,
            &daily_doc_id(&record.user_id, record.date),
            record,
        )
        .await
    }

    async fn get_latest_recovery(
        &self,
        user_id: &str,
    ) -> Result<Option<RecoveryRecord>, AppError> {
        self.latest_for_user(collections::RECOVERY, user_id).await
    }

    async fn upsert_sleep(&self, record: &SleepRecord) -> Result<(), AppError> {
        self.put(
            collections::SLEEP,
            &daily_doc_id(&record.user_id, record.date),
            record,
        )
        .await
    }

    async fn get_latest_sleep(&self, user_id: &str) -> Result<Option<SleepRecord>, AppError> {
        self.latest_for_user(collections::SLEEP, user_id).await
    }

    async fn upsert_strain(&self, record: &StrainRecord) -> Result<(), AppError> {
        self.put(
            collections::STRAIN,
            &daily_doc_id(&record.user_id, record.date),
            record,
        )
        .await
    }

    async fn get_latest_strain(&self, user_id: &str) -> Result<Option<StrainRecord>, AppError> {
        self.latest_for_user(collections::STRAIN, user_id).await
    }
}
