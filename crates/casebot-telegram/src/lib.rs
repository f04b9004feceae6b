// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram channel adapter for Casebot.
//!
//! Implements [`ChannelAdapter`] for the Telegram Bot API via teloxide:
//! long polling in a background task, authorization filtering, attachment
//! download, and text/document replies.

pub mod handler;
pub mod media;

use std::sync::Arc;

use async_trait::async_trait;
use casebot_config::model::TelegramConfig;
use casebot_core::types::{
    ChannelCapabilities, InboundMessage, MessageId, OutboundDocument, OutboundMessage,
};
use casebot_core::{AdapterType, CaseError, ChannelAdapter, HealthStatus, PluginAdapter};
use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile, Recipient};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Telegram's limit on a single text message, in characters.
pub const MAX_MESSAGE_LENGTH: usize = 4096;

/// Telegram channel adapter implementing [`ChannelAdapter`].
pub struct TelegramChannel {
    bot: Bot,
    config: TelegramConfig,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<InboundMessage>>,
    inbound_tx: mpsc::Sender<InboundMessage>,
    polling_handle: Option<tokio::task::JoinHandle<()>>,
}

impl TelegramChannel {
    /// Creates a new Telegram channel adapter. Requires `config.bot_token`.
    pub fn new(config: TelegramConfig) -> Result<Self, CaseError> {
        let token = config
            .bot_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                CaseError::InvalidConfiguration("telegram.bot_token is required".into())
            })?;

        let bot = Bot::new(token);
        let (inbound_tx, inbound_rx) = mpsc::channel(100);

        Ok(Self {
            bot,
            config,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            inbound_tx,
            polling_handle: None,
        })
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageId, CaseError> {
        let mut last = None;
        for chunk in split_message(text, MAX_MESSAGE_LENGTH) {
            let sent = self
                .bot
                .send_message(Recipient::Id(chat_id), chunk)
                .await
                .map_err(|e| CaseError::Channel {
                    message: format!("failed to send message: {e}"),
                    source: Some(Box::new(e)),
                })?;
            last = Some(MessageId(sent.id.0.to_string()));
        }
        last.ok_or_else(|| CaseError::InvalidInput("refusing to send an empty message".into()))
    }

    async fn send_document(
        &self,
        chat_id: ChatId,
        document: OutboundDocument,
    ) -> Result<MessageId, CaseError> {
        let size = document.data.len();
        let file = InputFile::memory(document.data).file_name(document.file_name.clone());
        let sent = self
            .bot
            .send_document(Recipient::Id(chat_id), file)
            .await
            .map_err(|e| CaseError::Channel {
                message: format!("failed to send document {}: {e}", document.file_name),
                source: Some(Box::new(e)),
            })?;
        debug!(file_name = %document.file_name, size, "document sent");
        Ok(MessageId(sent.id.0.to_string()))
    }
}

#[async_trait]
impl PluginAdapter for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, CaseError> {
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), CaseError> {
        debug!("Telegram channel shutting down");
        if let Some(handle) = &self.polling_handle {
            handle.abort();
        }
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for TelegramChannel {
    fn capabilities(&self) -> ChannelCapabilities {
        ChannelCapabilities {
            supports_images: true,
            supports_documents: true,
            max_message_length: Some(MAX_MESSAGE_LENGTH),
        }
    }

    async fn connect(&mut self) -> Result<(), CaseError> {
        if self.polling_handle.is_some() {
            return Ok(());
        }

        let bot = self.bot.clone();
        let tx = self.inbound_tx.clone();
        let allowed_users: Arc<Vec<String>> = Arc::new(self.config.allowed_users.clone());
        if allowed_users.is_empty() {
            warn!("telegram.allowed_users is empty, every sender is accepted");
        }

        info!("starting Telegram long polling");

        let handle = tokio::spawn(async move {
            let handler = Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
                let tx = tx.clone();
                let allowed = allowed_users.clone();
                async move {
                    if !handler::is_authorized(&msg, &allowed) {
                        debug!(chat_id = msg.chat.id.0, "ignoring unauthorized sender");
                        return respond(());
                    }

                    match handler::extract_content(&bot, &msg).await {
                        Ok(Some(content)) => {
                            let inbound = handler::to_inbound_message(&msg, content);
                            if tx.send(inbound).await.is_err() {
                                warn!("inbound channel closed, dropping message");
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            error!(error = %e, "failed to extract message content");
                            let _ = bot
                                .send_message(msg.chat.id, "Could not download the attachment.")
                                .await;
                        }
                    }

                    respond(())
                }
            });

            Dispatcher::builder(bot, handler)
                .default_handler(|_| async {})
                .build()
                .dispatch()
                .await;
        });

        self.polling_handle = Some(handle);
        Ok(())
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, CaseError> {
        let chat_id = extract_chat_id(&msg)?;
        let mut last = None;
        if !msg.content.trim().is_empty() {
            last = Some(self.send_text(chat_id, &msg.content).await?);
        }
        if let Some(document) = msg.document {
            last = Some(self.send_document(chat_id, document).await?);
        }
        last.ok_or_else(|| CaseError::InvalidInput("outbound message has no content".into()))
    }

    async fn receive(&self) -> Result<InboundMessage, CaseError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await.ok_or_else(|| CaseError::Channel {
            message: "Telegram inbound channel closed".into(),
            source: None,
        })
    }
}

/// Extracts the chat ID from an outbound message's metadata.
fn extract_chat_id(msg: &OutboundMessage) -> Result<ChatId, CaseError> {
    if let Some(ref metadata) = msg.metadata
        && let Ok(meta) = serde_json::from_str::<serde_json::Value>(metadata)
        && let Some(chat_id_str) = meta.get("chat_id").and_then(|v| v.as_str())
    {
        let id = chat_id_str.parse::<i64>().map_err(|e| CaseError::Channel {
            message: format!("invalid chat_id in metadata: {e}"),
            source: None,
        })?;
        return Ok(ChatId(id));
    }

    msg.channel
        .parse::<i64>()
        .map(ChatId)
        .map_err(|_| CaseError::Channel {
            message: "no valid chat_id in message metadata or channel field".into(),
            source: None,
        })
}

/// Splits text into chunks of at most `max` characters, preferring to break
/// after a newline.
pub fn split_message(text: &str, max: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let Some((limit, _)) = rest.char_indices().nth(max) else {
            chunks.push(rest);
            break;
        };
        let cut = rest[..limit]
            .rfind('\n')
            .map(|i| i + 1)
            .unwrap_or(limit);
        chunks.push(&rest[..cut]);
        rest = &rest[cut..];
    }
    chunks
}
