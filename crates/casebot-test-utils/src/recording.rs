// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Repository wrapper that records every persisted status per case.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use casebot_core::{
    AdapterType, Case, CaseError, CaseId, CasePatch, CaseRepository, CaseStatus, HealthStatus,
    PluginAdapter,
};

/// Delegates to an inner [`CaseRepository`] and keeps the status history of
/// each case, starting with `received` at creation.
pub struct RecordingRepository {
    inner: Arc<dyn CaseRepository>,
    history: Mutex<BTreeMap<CaseId, Vec<CaseStatus>>>,
}

impl RecordingRepository {
    pub fn new(inner: Arc<dyn CaseRepository>) -> Self {
        Self {
            inner,
            history: Mutex::new(BTreeMap::new()),
        }
    }

    /// Statuses persisted for `case_id`, in order.
    pub async fn statuses(&self, case_id: &CaseId) -> Vec<CaseStatus> {
        self.history
            .lock()
            .await
            .get(case_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl PluginAdapter for RecordingRepository {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn version(&self) -> semver::Version {
        self.inner.version()
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Repository
    }

    async fn health_check(&self) -> Result<HealthStatus, CaseError> {
        self.inner.health_check().await
    }

    async fn shutdown(&self) -> Result<(), CaseError> {
        self.inner.shutdown().await
    }
}

#[async_trait]
impl CaseRepository for RecordingRepository {
    async fn create(&self, sender_id: &str, title: Option<&str>) -> Result<CaseId, CaseError> {
        let id = self.inner.create(sender_id, title).await?;
        self.history
            .lock()
            .await
            .insert(id.clone(), vec![CaseStatus::Received]);
        Ok(id)
    }

    async fn update(&self, case_id: &CaseId, patch: CasePatch) -> Result<Case, CaseError> {
        let status = patch.status;
        let case = self.inner.update(case_id, patch).await?;
        if let Some(status) = status {
            self.history
                .lock()
                .await
                .entry(case_id.clone())
                .or_default()
                .push(status);
        }
        Ok(case)
    }

    async fn get(&self, case_id: &CaseId) -> Result<Case, CaseError> {
        self.inner.get(case_id).await
    }

    async fn latest_open(&self, sender_id: &str) -> Result<Option<Case>, CaseError> {
        self.inner.latest_open(sender_id).await
    }

    async fn latest_for_sender(&self, sender_id: &str) -> Result<Option<Case>, CaseError> {
        self.inner.latest_for_sender(sender_id).await
    }

    async fn list(&self, status: Option<CaseStatus>) -> Result<Vec<Case>, CaseError> {
        self.inner.list(status).await
    }
}
