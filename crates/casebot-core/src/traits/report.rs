// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Report rendering trait.

use async_trait::async_trait;

use crate::error::CaseError;
use crate::types::{Case, RenderedReport};

/// Renders case summaries into a deliverable document.
///
/// Implementations must never return empty bytes. When PDF output is not
/// available they produce UTF-8 text and report [`ReportFormat::Text`].
///
/// [`ReportFormat::Text`]: crate::types::ReportFormat::Text
#[async_trait]
pub trait ReportRenderer: Send + Sync + 'static {
    /// Renders a summary of `case`.
    async fn render(&self, case: &Case) -> Result<RenderedReport, CaseError>;

    /// Renders an analysis report for `sender_id` answering `request`, with
    /// the sender's latest `case` as context.
    async fn render_analysis(
        &self,
        sender_id: &str,
        case: Option<&Case>,
        request: &str,
        analysis: &str,
    ) -> Result<RenderedReport, CaseError>;
}
