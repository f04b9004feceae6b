// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Case repository and conversation history traits.

use async_trait::async_trait;

use crate::error::CaseError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Case, CaseId, CasePatch, CaseStatus, ChatMessage};

/// Owner of persisted case state.
///
/// `update` is a partial merge applied atomically: concurrent updates to the
/// same case never interleave, and neither caller's fields are lost.
#[async_trait]
pub trait CaseRepository: PluginAdapter {
    /// Creates a case in `received` state and returns its id.
    async fn create(&self, sender_id: &str, title: Option<&str>) -> Result<CaseId, CaseError>;

    /// Merges `patch` into the stored case and returns the merged result.
    async fn update(&self, case_id: &CaseId, patch: CasePatch) -> Result<Case, CaseError>;

    /// Loads a case; unknown ids yield `NotFound`.
    async fn get(&self, case_id: &CaseId) -> Result<Case, CaseError>;

    /// The most recent case of `sender_id` still in `received` state.
    async fn latest_open(&self, sender_id: &str) -> Result<Option<Case>, CaseError>;

    /// The most recent case of `sender_id` in any state.
    async fn latest_for_sender(&self, sender_id: &str) -> Result<Option<Case>, CaseError>;

    /// Lists cases, newest first, optionally filtered by status.
    async fn list(&self, status: Option<CaseStatus>) -> Result<Vec<Case>, CaseError>;
}

/// Persisted chat history used as language-model context.
#[async_trait]
pub trait ConversationStore: Send + Sync + 'static {
    async fn append_message(&self, message: &ChatMessage) -> Result<(), CaseError>;

    /// The last `limit` messages of `sender_id`, oldest first.
    async fn recent_messages(
        &self,
        sender_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, CaseError>;
}
