// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the case repository and conversation store.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use casebot_config::model::DatabaseConfig;
use casebot_core::types::ChatMessage;
use casebot_core::{
    AdapterType, Case, CaseError, CaseId, CasePatch, CaseRepository, CaseStatus,
    ConversationStore, HealthStatus, PluginAdapter,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed case repository.
///
/// The database is opened by [`SqliteStorage::initialize`]; every other
/// operation fails with `PersistenceUnavailable` until then.
pub struct SqliteStorage {
    config: DatabaseConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage. No connection is opened yet.
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Open the database and apply pending migrations.
    pub async fn initialize(&self) -> Result<(), CaseError> {
        let db = Database::open_with(&self.config.url, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| CaseError::PersistenceUnavailable {
            source: "storage already initialized".into(),
        })?;
        debug!(url = %self.config.url, "SQLite storage initialized");
        Ok(())
    }

    fn db(&self) -> Result<&Database, CaseError> {
        self.db.get().ok_or_else(|| CaseError::PersistenceUnavailable {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Repository
    }

    async fn health_check(&self) -> Result<HealthStatus, CaseError> {
        let Ok(db) = self.db() else {
            return Ok(HealthStatus::Unhealthy("database not initialized".into()));
        };
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CaseError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl CaseRepository for SqliteStorage {
    async fn create(&self, sender_id: &str, title: Option<&str>) -> Result<CaseId, CaseError> {
        queries::cases::create_case(self.db()?, sender_id, title).await
    }

    async fn update(&self, case_id: &CaseId, patch: CasePatch) -> Result<Case, CaseError> {
        queries::cases::update_case(self.db()?, case_id, patch).await
    }

    async fn get(&self, case_id: &CaseId) -> Result<Case, CaseError> {
        queries::cases::get_case(self.db()?, case_id).await
    }

    async fn latest_open(&self, sender_id: &str) -> Result<Option<Case>, CaseError> {
        queries::cases::latest_case_for_sender(self.db()?, sender_id, Some(CaseStatus::Received))
            .await
    }

    async fn latest_for_sender(&self, sender_id: &str) -> Result<Option<Case>, CaseError> {
        queries::cases::latest_case_for_sender(self.db()?, sender_id, None).await
    }

    async fn list(&self, status: Option<CaseStatus>) -> Result<Vec<Case>, CaseError> {
        queries::cases::list_cases(self.db()?, status).await
    }
}

#[async_trait]
impl ConversationStore for SqliteStorage {
    async fn append_message(&self, message: &ChatMessage) -> Result<(), CaseError> {
        queries::messages::insert_message(self.db()?, message).await
    }

    async fn recent_messages(
        &self,
        sender_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, CaseError> {
        queries::messages::recent_messages(self.db()?, sender_id, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config_in(dir: &std::path::Path) -> DatabaseConfig {
        DatabaseConfig {
            url: dir.join("cases.db").display().to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn operations_before_initialize_fail() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new(config_in(dir.path()));
        let err = storage.create("42", None).await.unwrap_err();
        assert!(matches!(err, CaseError::PersistenceUnavailable { .. }));
        assert!(matches!(
            storage.health_check().await.unwrap(),
            HealthStatus::Unhealthy(_)
        ));
    }

    #[tokio::test]
    async fn double_initialize_is_rejected() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new(config_in(dir.path()));
        storage.initialize().await.unwrap();
        assert!(storage.initialize().await.is_err());
    }

    #[tokio::test]
    async fn state_survives_reopen() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new(config_in(dir.path()));
        storage.initialize().await.unwrap();
        let id = storage.create("42", Some("Windscreen")).await.unwrap();
        storage
            .update(&id, CasePatch::status(CaseStatus::Stored))
            .await
            .unwrap();
        storage.shutdown().await.unwrap();
        drop(storage);

        let reopened = SqliteStorage::new(config_in(dir.path()));
        reopened.initialize().await.unwrap();
        assert_eq!(reopened.health_check().await.unwrap(), HealthStatus::Healthy);
        let case = reopened.get(&id).await.unwrap();
        assert_eq!(case.status, CaseStatus::Stored);
        assert_eq!(case.title.as_deref(), Some("Windscreen"));
    }
}
