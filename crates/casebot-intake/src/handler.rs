// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-event dispatch: commands, attachments, and conversation turns.

use std::sync::Arc;
use std::time::Duration;

use casebot_config::model::AgentConfig;
use casebot_core::types::{
    ChatMessage, ChatRole, InboundMessage, MessageContent, OutboundDocument, OutboundMessage,
    ProviderMessage, ProviderRequest,
};
use casebot_core::{
    BlobStore, CaseError, CaseRepository, ChannelAdapter, ConversationStore, DocumentExtractor,
    Locator, ProviderAdapter, RenderedReport, ReportRenderer, WriteMode,
};
use tracing::{debug, info, warn};

use crate::pipeline::{Attachment, CasePipeline, PipelineFailure, PipelineOutcome};

/// Reply sent when a pipeline outlives the response timeout.
pub const STILL_PROCESSING: &str =
    "Your file is still being processed. The report will follow when it is ready.";

/// Conversation and timing settings taken from `[agent]`.
#[derive(Debug, Clone)]
pub struct IntakeSettings {
    pub bot_name: String,
    pub system_prompt: String,
    pub history_limit: usize,
    pub response_timeout: Duration,
    pub report_keywords: Vec<String>,
}

impl IntakeSettings {
    pub fn from_config(agent: &AgentConfig) -> Self {
        Self {
            bot_name: agent.name.clone(),
            system_prompt: agent.system_prompt.clone(),
            history_limit: agent.history_limit,
            response_timeout: Duration::from_secs(agent.response_timeout_secs),
            report_keywords: agent
                .report_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// True if `text` contains one of the report keywords, ignoring case.
    pub fn wants_report(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.report_keywords.iter().any(|k| text.contains(k.as_str()))
    }
}

/// Collaborators the handler talks to.
pub struct IntakeDeps {
    pub channel: Arc<dyn ChannelAdapter>,
    pub blobs: Arc<dyn BlobStore>,
    pub repository: Arc<dyn CaseRepository>,
    pub conversation: Arc<dyn ConversationStore>,
    pub extractor: Arc<dyn DocumentExtractor>,
    pub renderer: Arc<dyn ReportRenderer>,
    pub provider: Arc<dyn ProviderAdapter>,
}

/// Handles one inbound event end to end, including the reply.
pub struct IntakeHandler {
    channel: Arc<dyn ChannelAdapter>,
    blobs: Arc<dyn BlobStore>,
    repository: Arc<dyn CaseRepository>,
    conversation: Arc<dyn ConversationStore>,
    renderer: Arc<dyn ReportRenderer>,
    provider: Arc<dyn ProviderAdapter>,
    pipeline: Arc<CasePipeline>,
    settings: IntakeSettings,
}

impl IntakeHandler {
    pub fn new(deps: IntakeDeps, settings: IntakeSettings) -> Self {
        let pipeline = Arc::new(CasePipeline::new(
            deps.blobs.clone(),
            deps.repository.clone(),
            deps.extractor,
            deps.renderer.clone(),
        ));
        Self {
            channel: deps.channel,
            blobs: deps.blobs,
            repository: deps.repository,
            conversation: deps.conversation,
            renderer: deps.renderer,
            provider: deps.provider,
            pipeline,
            settings,
        }
    }

    pub fn settings(&self) -> &IntakeSettings {
        &self.settings
    }

    pub fn pipeline(&self) -> &CasePipeline {
        &self.pipeline
    }

    /// Dispatches one inbound event. Errors returned here are reply
    /// failures; processing errors are answered in the chat instead.
    pub async fn handle(&self, inbound: InboundMessage) -> Result<(), CaseError> {
        debug!(
            id = inbound.id.as_str(),
            sender_id = inbound.sender_id.as_str(),
            channel = inbound.channel.as_str(),
            "handling inbound event"
        );

        match &inbound.content {
            MessageContent::Command { name, args } => {
                self.handle_command(&inbound, name, args).await
            }
            MessageContent::Text(text) => self.handle_text(&inbound, text).await,
            MessageContent::Image {
                data,
                mime_type,
                caption,
            } => {
                let attachment = Attachment::new(
                    format!("photo_{}.jpg", inbound.id),
                    mime_type.clone(),
                    data.clone(),
                );
                self.handle_attachment(&inbound, attachment, caption.as_deref())
                    .await
            }
            MessageContent::Document {
                data,
                filename,
                mime_type,
            } => {
                let attachment = Attachment::new(filename.clone(), mime_type.clone(), data.clone());
                self.handle_attachment(&inbound, attachment, None).await
            }
        }
    }

    async fn handle_command(
        &self,
        inbound: &InboundMessage,
        name: &str,
        args: &str,
    ) -> Result<(), CaseError> {
        match name {
            "start" | "help" => self.reply(inbound, self.greeting()).await,
            "newcase" => {
                let title = if args.is_empty() {
                    format!("Case {}", chrono::Utc::now().timestamp())
                } else {
                    args.to_string()
                };
                match self
                    .repository
                    .create(&inbound.sender_id, Some(&title))
                    .await
                {
                    Ok(case_id) => {
                        info!(case_id = %case_id, sender_id = inbound.sender_id.as_str(), "case opened");
                        self.reply(
                            inbound,
                            format!(
                                "Created case {case_id}: {title}. Files you send now are attached to it."
                            ),
                        )
                        .await
                    }
                    Err(e) => {
                        warn!(error = %e, "could not create case");
                        self.reply(inbound, e.user_message()).await
                    }
                }
            }
            other => {
                debug!(command = other, "unknown command");
                self.reply(inbound, format!("Unknown command /{other}.\n\n{}", self.greeting()))
                    .await
            }
        }
    }

    fn greeting(&self) -> String {
        format!(
            "Hello, I am {}. Send a PDF or a photo to open a claim case, or ask me \
             anything about an assessment. Use /newcase [title] to start a fresh case.",
            self.settings.bot_name
        )
    }

    async fn handle_attachment(
        &self,
        inbound: &InboundMessage,
        attachment: Attachment,
        caption: Option<&str>,
    ) -> Result<(), CaseError> {
        let label = if attachment.is_pdf() {
            "pdf"
        } else if attachment.mime_type.starts_with("image/") {
            "image"
        } else {
            "file"
        };

        let pipeline = self.pipeline.clone();
        let sender_id = inbound.sender_id.clone();
        let mut task = tokio::spawn(async move { pipeline.run(&sender_id, attachment).await });

        let joined = match tokio::time::timeout(self.settings.response_timeout, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                info!(
                    sender_id = inbound.sender_id.as_str(),
                    "pipeline still running after response timeout"
                );
                if let Err(e) = self.reply(inbound, STILL_PROCESSING).await {
                    warn!(error = %e, "could not send progress reply");
                }
                task.await
            }
        };
        let result = joined.unwrap_or_else(|e| {
            Err(PipelineFailure {
                case_id: None,
                error: CaseError::Internal(format!("pipeline task aborted: {e}")),
            })
        });

        match result {
            Ok(outcome) => {
                let mut note = format!("[{label}:{}]", outcome.stored);
                if let Some(caption) = caption.filter(|c| !c.trim().is_empty()) {
                    note.push(' ');
                    note.push_str(caption.trim());
                }
                self.remember(&inbound.sender_id, ChatRole::User, &note).await;
                self.reply_with_outcome(inbound, &outcome).await
            }
            Err(failure) => self.reply(inbound, failure_text(&failure)).await,
        }
    }

    async fn reply_with_outcome(
        &self,
        inbound: &InboundMessage,
        outcome: &PipelineOutcome,
    ) -> Result<(), CaseError> {
        let case = &outcome.case;
        let text = format!(
            "Case {}: stored {}. {} field(s) on record. Report attached.",
            case.case_id,
            outcome.stored.file_name(),
            case.extracted_fields.len()
        );
        let document = document_for(outcome.report_file_name(), &outcome.report);
        self.channel
            .send(OutboundMessage::reply_to(inbound, text).with_document(document))
            .await?;
        Ok(())
    }

    async fn handle_text(&self, inbound: &InboundMessage, text: &str) -> Result<(), CaseError> {
        let sender_id = inbound.sender_id.as_str();
        self.remember(sender_id, ChatRole::User, text).await;

        let messages = match self
            .conversation
            .recent_messages(sender_id, self.settings.history_limit)
            .await
        {
            Ok(history) if !history.is_empty() => history
                .into_iter()
                .map(|m| ProviderMessage {
                    role: m.role,
                    content: m.content,
                })
                .collect(),
            Ok(_) => vec![user_message(text)],
            Err(e) => {
                warn!(error = %e, "conversation history unavailable");
                vec![user_message(text)]
            }
        };
        let request = ProviderRequest {
            system_prompt: Some(self.settings.system_prompt.clone()),
            messages,
        };

        let timeout = self.settings.response_timeout;
        let answer = match tokio::time::timeout(timeout, self.provider.complete(request)).await {
            Ok(Ok(response)) => response.content,
            Ok(Err(e)) => {
                warn!(error = %e, "model call failed");
                return self.reply(inbound, e.user_message()).await;
            }
            Err(_) => {
                warn!(timeout_secs = timeout.as_secs(), "model call timed out");
                let err = CaseError::Timeout { duration: timeout };
                return self.reply(inbound, err.user_message()).await;
            }
        };
        self.remember(sender_id, ChatRole::Assistant, &answer).await;

        if !self.settings.wants_report(text) {
            return self.reply(inbound, answer).await;
        }

        match self.chat_report(sender_id, text, &answer).await {
            Ok((locator, report)) => {
                info!(sender_id, locator = %locator, "chat report created");
                let document = document_for(locator.file_name().to_string(), &report);
                self.channel
                    .send(OutboundMessage::reply_to(inbound, answer).with_document(document))
                    .await?;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "chat report failed");
                let text = format!(
                    "{answer}\n\nThe report could not be created. {}",
                    e.user_message()
                );
                self.reply(inbound, text).await
            }
        }
    }

    /// Renders the analysis report and stores it under `reports/<sender>`.
    async fn chat_report(
        &self,
        sender_id: &str,
        request: &str,
        analysis: &str,
    ) -> Result<(Locator, RenderedReport), CaseError> {
        let latest = match self.repository.latest_for_sender(sender_id).await {
            Ok(case) => case,
            Err(e) => {
                warn!(error = %e, "latest case unavailable for report");
                None
            }
        };
        let report = self
            .renderer
            .render_analysis(sender_id, latest.as_ref(), request, analysis)
            .await?;
        let name = format!(
            "report_{}.{}",
            chrono::Utc::now().timestamp(),
            report.format.extension()
        );
        let locator = self
            .blobs
            .store(
                &format!("reports/{sender_id}"),
                &name,
                &report.bytes,
                WriteMode::Overwrite,
            )
            .await?;
        Ok((locator, report))
    }

    /// Appends to the sender's conversation. History is best effort.
    async fn remember(&self, sender_id: &str, role: ChatRole, content: &str) {
        let message = ChatMessage {
            id: uuid::Uuid::new_v4().to_string(),
            sender_id: sender_id.to_string(),
            role,
            content: content.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        if let Err(e) = self.conversation.append_message(&message).await {
            warn!(error = %e, sender_id, "could not persist conversation message");
        }
    }

    async fn reply(
        &self,
        inbound: &InboundMessage,
        text: impl Into<String>,
    ) -> Result<(), CaseError> {
        self.channel
            .send(OutboundMessage::reply_to(inbound, text))
            .await?;
        Ok(())
    }

    /// Shuts down every collaborator. The repository error, if any, is
    /// returned; the others are logged.
    pub async fn shutdown(&self) -> Result<(), CaseError> {
        if let Err(e) = self.channel.shutdown().await {
            warn!(error = %e, "channel shutdown failed");
        }
        if let Err(e) = self.provider.shutdown().await {
            warn!(error = %e, "provider shutdown failed");
        }
        if let Err(e) = self.blobs.shutdown().await {
            warn!(error = %e, "blob store shutdown failed");
        }
        self.repository.shutdown().await
    }
}

fn user_message(text: &str) -> ProviderMessage {
    ProviderMessage {
        role: ChatRole::User,
        content: text.to_string(),
    }
}

fn document_for(file_name: String, report: &RenderedReport) -> OutboundDocument {
    OutboundDocument {
        file_name,
        mime_type: report.format.mime_type().to_string(),
        data: report.bytes.clone(),
    }
}

fn failure_text(failure: &PipelineFailure) -> String {
    match &failure.case_id {
        Some(case_id) => format!(
            "{} Case {case_id} was marked failed.",
            failure.error.user_message()
        ),
        None => failure.error.user_message().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use casebot_core::CaseId;

    fn settings() -> IntakeSettings {
        IntakeSettings::from_config(&AgentConfig::default())
    }

    #[test]
    fn report_keywords_match_case_insensitively() {
        let s = settings();
        assert!(s.wants_report("Please write a REPORT for this claim"));
        assert!(s.wants_report("Làm Báo Cáo giúp tôi"));
        assert!(!s.wants_report("what is the deductible?"));
    }

    #[test]
    fn empty_keywords_are_ignored() {
        let mut agent = AgentConfig::default();
        agent.report_keywords = vec![String::new(), "Summary".into()];
        let s = IntakeSettings::from_config(&agent);
        assert_eq!(s.report_keywords, vec!["summary".to_string()]);
        assert!(!s.wants_report("anything"));
    }

    #[test]
    fn failure_text_mentions_failed_case() {
        let failure = PipelineFailure {
            case_id: Some(CaseId::from_row_id(3)),
            error: CaseError::MalformedDocument("truncated".into()),
        };
        let text = failure_text(&failure);
        assert!(text.starts_with("The uploaded PDF could not be read."));
        assert!(text.ends_with("Case C3 was marked failed."));

        let failure = PipelineFailure {
            case_id: None,
            error: CaseError::PersistenceUnavailable {
                source: Box::new(std::io::Error::other("locked")),
            },
        };
        assert_eq!(
            failure_text(&failure),
            "The case database is currently unavailable."
        );
    }
}
