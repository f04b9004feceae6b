// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The attachment pipeline: `received → stored → (extracted) → reported`.
//!
//! Every transition is persisted before the next stage starts, so a crash
//! leaves the case in its last persisted state. Any collaborator error moves
//! the case to `failed` with the error kind recorded.

use std::fmt;
use std::sync::Arc;

use casebot_core::{
    BlobStore, Case, CaseError, CaseId, CasePatch, CaseRepository, CaseStatus, DocumentExtractor,
    Locator, RenderedReport, ReportRenderer, WriteMode,
};
use tracing::{debug, error, info, warn};

use crate::locks::CaseLocks;

/// A file received from the chat, ready to be attached to a case.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Only PDFs go through field extraction.
    pub fn is_pdf(&self) -> bool {
        self.mime_type.eq_ignore_ascii_case("application/pdf")
            || self.file_name.to_ascii_lowercase().ends_with(".pdf")
    }
}

/// Result of a pipeline that reached `reported`.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub case: Case,
    pub stored: Locator,
    pub report: RenderedReport,
}

impl PipelineOutcome {
    /// File name the report is delivered under, e.g. `C1_report.pdf`.
    pub fn report_file_name(&self) -> String {
        report_file_name(&self.case.case_id, &self.report)
    }
}

/// A pipeline that stopped early. `case_id` is `None` when no case could be
/// claimed at all.
#[derive(Debug)]
pub struct PipelineFailure {
    pub case_id: Option<CaseId>,
    pub error: CaseError,
}

impl fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.case_id {
            Some(id) => write!(f, "case {id}: {}", self.error),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for PipelineFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

fn report_file_name(case_id: &CaseId, report: &RenderedReport) -> String {
    format!("{case_id}_report.{}", report.format.extension())
}

/// Drives attachments through storage, extraction, and reporting.
pub struct CasePipeline {
    blobs: Arc<dyn BlobStore>,
    repository: Arc<dyn CaseRepository>,
    extractor: Arc<dyn DocumentExtractor>,
    renderer: Arc<dyn ReportRenderer>,
    locks: CaseLocks,
}

impl CasePipeline {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        repository: Arc<dyn CaseRepository>,
        extractor: Arc<dyn DocumentExtractor>,
        renderer: Arc<dyn ReportRenderer>,
    ) -> Self {
        Self {
            blobs,
            repository,
            extractor,
            renderer,
            locks: CaseLocks::new(),
        }
    }

    pub fn locks(&self) -> &CaseLocks {
        &self.locks
    }

    /// Attaches `attachment` to the sender's open case (or a new one) and
    /// runs it to `reported`.
    pub async fn run(
        &self,
        sender_id: &str,
        attachment: Attachment,
    ) -> Result<PipelineOutcome, PipelineFailure> {
        let (case_id, guard) = self
            .claim_open_case(sender_id)
            .await
            .map_err(|error| PipelineFailure {
                case_id: None,
                error,
            })?;

        info!(
            case_id = %case_id,
            sender_id,
            file_name = attachment.file_name.as_str(),
            size = attachment.data.len(),
            "processing attachment"
        );

        let result = self.advance(&case_id, &attachment).await;
        let result = match result {
            Ok(outcome) => {
                info!(
                    case_id = %case_id,
                    format = %outcome.report.format,
                    "case reported"
                );
                Ok(outcome)
            }
            Err(error) => {
                warn!(case_id = %case_id, error = %error, "pipeline failed");
                self.record_failure(&case_id, &error).await;
                Err(PipelineFailure {
                    case_id: Some(case_id.clone()),
                    error,
                })
            }
        };

        drop(guard);
        self.locks.prune(&case_id);
        result
    }

    /// Finds the sender's `received` case or creates one, and locks it.
    ///
    /// Another pipeline may advance the candidate while we wait for the lock;
    /// the case is re-read under the lock and the search restarts if it has
    /// moved on.
    async fn claim_open_case(
        &self,
        sender_id: &str,
    ) -> Result<(CaseId, tokio::sync::OwnedMutexGuard<()>), CaseError> {
        loop {
            let candidate = match self.repository.latest_open(sender_id).await? {
                Some(case) => case.case_id,
                None => self.repository.create(sender_id, None).await?,
            };
            let guard = self.locks.lock(&candidate).await;
            let case = self.repository.get(&candidate).await?;
            if case.status == CaseStatus::Received {
                return Ok((candidate, guard));
            }
            debug!(case_id = %candidate, status = %case.status, "case moved on, retrying");
            drop(guard);
            self.locks.prune(&candidate);
        }
    }

    async fn advance(
        &self,
        case_id: &CaseId,
        attachment: &Attachment,
    ) -> Result<PipelineOutcome, CaseError> {
        let scope = case_id.as_str();

        let stored = self
            .blobs
            .store(
                scope,
                &attachment.file_name,
                &attachment.data,
                WriteMode::CreateNew,
            )
            .await?;
        let mut case = self
            .repository
            .update(
                case_id,
                CasePatch::status(CaseStatus::Stored).with_file_ref(stored.clone()),
            )
            .await?;
        debug!(case_id = %case_id, locator = %stored, "attachment stored");

        if attachment.is_pdf() {
            let fields = self.extractor.extract(&attachment.data).await?;
            debug!(case_id = %case_id, fields = fields.len(), "fields extracted");
            case = self
                .repository
                .update(
                    case_id,
                    CasePatch::status(CaseStatus::Extracted).with_fields(fields),
                )
                .await?;
        }

        let report = self.renderer.render(&case).await?;
        let report_ref = self
            .blobs
            .store(
                scope,
                &report_file_name(case_id, &report),
                &report.bytes,
                WriteMode::Overwrite,
            )
            .await?;
        let case = self
            .repository
            .update(
                case_id,
                CasePatch::status(CaseStatus::Reported).with_report(report_ref, report.format),
            )
            .await?;

        Ok(PipelineOutcome {
            case,
            stored,
            report,
        })
    }

    async fn record_failure(&self, case_id: &CaseId, err: &CaseError) {
        if let Err(e) = self
            .repository
            .update(case_id, CasePatch::failed(err))
            .await
        {
            error!(case_id = %case_id, error = %e, "could not record case failure");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use casebot_core::ReportFormat;

    #[test]
    fn pdf_detection_uses_mime_or_extension() {
        assert!(Attachment::new("claim.PDF", "application/octet-stream", vec![1]).is_pdf());
        assert!(Attachment::new("upload", "application/pdf", vec![1]).is_pdf());
        assert!(!Attachment::new("photo_7.jpg", "image/jpeg", vec![1]).is_pdf());
    }

    #[test]
    fn report_name_follows_format() {
        let report = RenderedReport {
            bytes: b"x".to_vec(),
            format: ReportFormat::Text,
        };
        assert_eq!(
            report_file_name(&CaseId::from_row_id(4), &report),
            "C4_report.txt"
        );
    }

    #[test]
    fn failure_display_names_case() {
        let failure = PipelineFailure {
            case_id: Some(CaseId::from_row_id(2)),
            error: CaseError::MalformedDocument("no header".into()),
        };
        assert!(failure.to_string().starts_with("case C2:"));
    }
}
