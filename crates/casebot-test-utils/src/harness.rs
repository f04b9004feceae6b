// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the complete intake stack with mock chat and
//! model adapters, a temp SQLite database, and a temp media directory.
//! The `send_*` helpers drive one event through the real handler and
//! return the replies it produced.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use casebot_blob::LocalBlobStore;
use casebot_config::model::{
    AgentConfig, CasebotConfig, DatabaseConfig, ExtractorConfig, FieldRule, ReportConfig,
    StorageConfig,
};
use casebot_core::types::{InboundMessage, MessageContent, OutboundMessage};
use casebot_core::{Case, CaseError, RenderedReport, ReportRenderer};
use casebot_extract::PdfFieldExtractor;
use casebot_intake::{IntakeDeps, IntakeHandler, IntakeSettings};
use casebot_report::layout::ReportDocument;
use casebot_report::{ReportGenerator, detect_capability};
use casebot_storage::SqliteStorage;

use crate::mock_channel::MockChannel;
use crate::mock_provider::MockProvider;
use crate::recording::RecordingRepository;

const MAX_BLOB_BYTES: u64 = 8 * 1024 * 1024;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    responses: Vec<String>,
    system_prompt: Option<String>,
    field_rules: Vec<FieldRule>,
    pdf_reports: bool,
    response_timeout: Duration,
    render_delay: Option<Duration>,
    provider_delay: Option<Duration>,
    max_blob_bytes: u64,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            responses: Vec::new(),
            system_prompt: None,
            field_rules: Vec::new(),
            pdf_reports: true,
            response_timeout: Duration::from_secs(10),
            render_delay: None,
            provider_delay: None,
            max_blob_bytes: MAX_BLOB_BYTES,
        }
    }

    /// Set mock provider responses.
    pub fn with_mock_responses(mut self, responses: Vec<String>) -> Self {
        self.responses = responses;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Add an extraction rule (`name`, regex).
    pub fn with_field_rule(mut self, name: &str, pattern: &str) -> Self {
        self.field_rules.push(FieldRule {
            name: name.to_string(),
            pattern: pattern.to_string(),
        });
        self
    }

    /// `false` forces plain-text reports.
    pub fn with_pdf_reports(mut self, enabled: bool) -> Self {
        self.pdf_reports = enabled;
        self
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Delay every case report render, to exercise the still-processing path.
    pub fn with_render_delay(mut self, delay: Duration) -> Self {
        self.render_delay = Some(delay);
        self
    }

    pub fn with_provider_delay(mut self, delay: Duration) -> Self {
        self.provider_delay = Some(delay);
        self
    }

    /// Lower the per-blob size limit of the local store.
    pub fn with_max_blob_bytes(mut self, limit: u64) -> Self {
        self.max_blob_bytes = limit;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, CaseError> {
        let temp_dir = tempfile::TempDir::new().map_err(|e| CaseError::StorageUnavailable {
            message: "cannot create temp dir".into(),
            source: Some(Box::new(e)),
        })?;
        let media_dir = temp_dir.path().join("media");
        let db_path = temp_dir.path().join("cases.db");

        let mut agent = AgentConfig::default();
        if let Some(prompt) = self.system_prompt {
            agent.system_prompt = prompt;
        }
        agent.response_timeout_secs = self.response_timeout.as_secs().max(1);

        let config = CasebotConfig {
            agent,
            storage: StorageConfig {
                media_dir: media_dir.to_string_lossy().to_string(),
                max_blob_bytes: self.max_blob_bytes,
                ..StorageConfig::default()
            },
            database: DatabaseConfig {
                url: db_path.to_string_lossy().to_string(),
                wal_mode: true,
            },
            report: ReportConfig {
                pdf_enabled: self.pdf_reports,
            },
            extractor: ExtractorConfig {
                fields: self.field_rules,
            },
            ..CasebotConfig::default()
        };

        let storage = Arc::new(SqliteStorage::new(config.database.clone()));
        storage.initialize().await?;
        let repository = Arc::new(RecordingRepository::new(storage.clone()));

        let blobs = Arc::new(LocalBlobStore::new(&media_dir, self.max_blob_bytes)?);
        let extractor = Arc::new(PdfFieldExtractor::new(&config.extractor.fields)?);
        let generator = ReportGenerator::new(
            config.agent.name.clone(),
            detect_capability(&config.report),
        );
        let renderer: Arc<dyn ReportRenderer> = match self.render_delay {
            Some(delay) => Arc::new(DelayedRenderer {
                inner: generator,
                delay,
            }),
            None => Arc::new(generator),
        };

        let mut provider = if self.responses.is_empty() {
            MockProvider::new()
        } else {
            MockProvider::with_responses(self.responses)
        };
        if let Some(delay) = self.provider_delay {
            provider = provider.with_delay(delay);
        }
        let mock_provider = Arc::new(provider);
        let mock_channel = Arc::new(MockChannel::new());

        let mut settings = IntakeSettings::from_config(&config.agent);
        settings.response_timeout = self.response_timeout;

        let handler = Arc::new(IntakeHandler::new(
            IntakeDeps {
                channel: mock_channel.clone(),
                blobs: blobs.clone(),
                repository: repository.clone(),
                conversation: storage.clone(),
                extractor,
                renderer,
                provider: mock_provider.clone(),
            },
            settings,
        ));

        Ok(TestHarness {
            mock_channel,
            mock_provider,
            storage,
            repository,
            blobs,
            handler,
            config,
            media_dir,
            next_id: AtomicU64::new(1),
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters and temp storage.
pub struct TestHarness {
    /// The mock chat channel; replies are captured here.
    pub mock_channel: Arc<MockChannel>,
    /// The mock language model.
    pub mock_provider: Arc<MockProvider>,
    /// SQLite storage (temp DB, cleaned up on drop).
    pub storage: Arc<SqliteStorage>,
    /// The repository the handler writes through, recording statuses.
    pub repository: Arc<RecordingRepository>,
    /// Local blob store rooted at `media_dir`.
    pub blobs: Arc<LocalBlobStore>,
    pub handler: Arc<IntakeHandler>,
    pub config: CasebotConfig,
    pub media_dir: PathBuf,
    next_id: AtomicU64,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Builds an inbound event with a fresh numeric message id.
    pub fn inbound(&self, sender_id: &str, content: MessageContent) -> InboundMessage {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        InboundMessage {
            id: id.to_string(),
            channel: "mock".to_string(),
            sender_id: sender_id.to_string(),
            content,
            timestamp: chrono::Utc::now().to_rfc3339(),
            metadata: Some(format!(r#"{{"chat_id":"{sender_id}"}}"#)),
        }
    }

    /// Runs one event through the handler and returns the replies it sent.
    pub async fn dispatch(&self, inbound: InboundMessage) -> Result<Vec<OutboundMessage>, CaseError> {
        let before = self.mock_channel.sent_count().await;
        self.handler.handle(inbound).await?;
        let sent = self.mock_channel.sent_messages().await;
        Ok(sent.into_iter().skip(before).collect())
    }

    pub async fn send_text(&self, sender_id: &str, text: &str) -> Result<Vec<OutboundMessage>, CaseError> {
        let inbound = self.inbound(sender_id, MessageContent::Text(text.to_string()));
        self.dispatch(inbound).await
    }

    pub async fn send_command(
        &self,
        sender_id: &str,
        name: &str,
        args: &str,
    ) -> Result<Vec<OutboundMessage>, CaseError> {
        let inbound = self.inbound(
            sender_id,
            MessageContent::Command {
                name: name.to_string(),
                args: args.to_string(),
            },
        );
        self.dispatch(inbound).await
    }

    pub async fn send_document(
        &self,
        sender_id: &str,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<Vec<OutboundMessage>, CaseError> {
        let mime_type = if filename.to_ascii_lowercase().ends_with(".pdf") {
            "application/pdf"
        } else {
            "application/octet-stream"
        };
        let inbound = self.inbound(
            sender_id,
            MessageContent::Document {
                data,
                filename: filename.to_string(),
                mime_type: mime_type.to_string(),
            },
        );
        self.dispatch(inbound).await
    }

    pub async fn send_photo(
        &self,
        sender_id: &str,
        data: Vec<u8>,
        caption: Option<&str>,
    ) -> Result<Vec<OutboundMessage>, CaseError> {
        let inbound = self.inbound(
            sender_id,
            MessageContent::Image {
                data,
                mime_type: "image/jpeg".to_string(),
                caption: caption.map(str::to_string),
            },
        );
        self.dispatch(inbound).await
    }
}

/// Builds a PDF whose pages carry `lines` as extractable text.
pub fn make_pdf(lines: &[&str]) -> Vec<u8> {
    let doc = ReportDocument {
        heading: "Claim form".to_string(),
        lines: lines.iter().map(|l| l.to_string()).collect(),
    };
    match casebot_report::pdf::render_pdf(&doc) {
        Ok(bytes) => bytes,
        Err(e) => panic!("test PDF failed to render: {e}"),
    }
}

/// Renderer that sleeps before every case report.
struct DelayedRenderer {
    inner: ReportGenerator,
    delay: Duration,
}

#[async_trait]
impl ReportRenderer for DelayedRenderer {
    async fn render(&self, case: &Case) -> Result<RenderedReport, CaseError> {
        tokio::time::sleep(self.delay).await;
        self.inner.render(case).await
    }

    async fn render_analysis(
        &self,
        sender_id: &str,
        case: Option<&Case>,
        request: &str,
        analysis: &str,
    ) -> Result<RenderedReport, CaseError> {
        self.inner
            .render_analysis(sender_id, case, request, analysis)
            .await
    }
}
