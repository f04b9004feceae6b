// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Case report generation.
//!
//! Reports are PDF when the capability probe succeeds at startup and plain
//! UTF-8 text otherwise. Rendering is CPU-bound and runs on the blocking pool.

pub mod layout;
pub mod pdf;

use async_trait::async_trait;
use casebot_config::model::ReportConfig;
use casebot_core::{Case, CaseError, PdfCapability, RenderedReport, ReportFormat, ReportRenderer};
use tracing::{debug, info, warn};

use crate::layout::ReportDocument;

/// Decide once whether PDF reports can be produced.
///
/// PDF is used only when enabled in configuration and a probe document
/// renders successfully.
pub fn detect_capability(config: &ReportConfig) -> PdfCapability {
    if !config.pdf_enabled {
        info!("PDF reports disabled by configuration, using text reports");
        return PdfCapability::Unavailable;
    }
    let probe = ReportDocument {
        heading: "probe".into(),
        lines: vec!["probe".into()],
    };
    match pdf::render_pdf(&probe) {
        Ok(bytes) if !bytes.is_empty() => {
            debug!("PDF capability probe succeeded");
            PdfCapability::Available
        }
        Ok(_) => {
            warn!("PDF capability probe produced no output, using text reports");
            PdfCapability::Unavailable
        }
        Err(e) => {
            warn!(error = %e, "PDF capability probe failed, using text reports");
            PdfCapability::Unavailable
        }
    }
}

/// Renders case and analysis reports in the detected format.
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    bot_name: String,
    capability: PdfCapability,
}

impl ReportGenerator {
    pub fn new(bot_name: impl Into<String>, capability: PdfCapability) -> Self {
        Self {
            bot_name: bot_name.into(),
            capability,
        }
    }

    pub fn capability(&self) -> PdfCapability {
        self.capability
    }

    async fn render_document(&self, doc: ReportDocument) -> Result<RenderedReport, CaseError> {
        if self.capability == PdfCapability::Available {
            let text = doc.to_text();
            let rendered = tokio::task::spawn_blocking(move || pdf::render_pdf(&doc))
                .await
                .map_err(|e| CaseError::Internal(format!("report render task failed: {e}")))?;
            match rendered {
                Ok(bytes) if !bytes.is_empty() => {
                    return Ok(RenderedReport {
                        bytes,
                        format: ReportFormat::Pdf,
                    });
                }
                Ok(_) => warn!("PDF renderer returned no bytes, falling back to text"),
                Err(e) => warn!(error = %e, "PDF render failed, falling back to text"),
            }
            return Ok(text_report(text));
        }
        Ok(text_report(doc.to_text()))
    }
}

fn text_report(text: String) -> RenderedReport {
    RenderedReport {
        bytes: text.into_bytes(),
        format: ReportFormat::Text,
    }
}

#[async_trait]
impl ReportRenderer for ReportGenerator {
    async fn render(&self, case: &Case) -> Result<RenderedReport, CaseError> {
        let report = self
            .render_document(layout::case_summary(&self.bot_name, case))
            .await?;
        debug!(
            case_id = %case.case_id,
            format = %report.format,
            size = report.bytes.len(),
            "case report rendered"
        );
        Ok(report)
    }

    async fn render_analysis(
        &self,
        sender_id: &str,
        case: Option<&Case>,
        request: &str,
        analysis: &str,
    ) -> Result<RenderedReport, CaseError> {
        let generated_at = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        let doc = layout::analysis_report(
            &self.bot_name,
            sender_id,
            &generated_at,
            case,
            request,
            analysis,
        );
        self.render_document(doc).await
    }
}
