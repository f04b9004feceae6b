// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authorization filtering and content extraction.
//!
//! Turns an incoming Telegram message into a channel-agnostic
//! [`InboundMessage`]: commands, text, photos, and documents.

use casebot_core::CaseError;
use casebot_core::types::{InboundMessage, MessageContent};
use teloxide::prelude::*;
use tracing::debug;

use crate::media;

/// Checks whether the message sender may use the bot.
///
/// An empty `allowed_users` list accepts every sender. Otherwise the
/// sender's numeric id or username (with or without `@`) must be listed.
/// Messages without a sender (channel posts) are never accepted.
pub fn is_authorized(msg: &Message, allowed_users: &[String]) -> bool {
    let Some(user) = msg.from.as_ref() else {
        return false;
    };
    if allowed_users.is_empty() {
        return true;
    }

    let user_id = user.id.0.to_string();
    allowed_users.iter().any(|allowed| {
        *allowed == user_id
            || user.username.as_deref().is_some_and(|username| {
                username.eq_ignore_ascii_case(allowed.strip_prefix('@').unwrap_or(allowed))
            })
    })
}

/// Splits `/name@bot args` into `("name", "args")`.
pub fn parse_command(text: &str) -> Option<(String, String)> {
    let rest = text.trim().strip_prefix('/')?;
    let (head, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    let name = head.split('@').next().unwrap_or(head);
    if name.is_empty() {
        return None;
    }
    Some((name.to_ascii_lowercase(), args.trim().to_string()))
}

/// Extracts content from a Telegram message.
///
/// Returns `None` for unsupported message types (stickers, voice, locations).
pub async fn extract_content(
    bot: &Bot,
    msg: &Message,
) -> Result<Option<MessageContent>, CaseError> {
    if let Some(text) = msg.text() {
        let content = match parse_command(text) {
            Some((name, args)) => MessageContent::Command { name, args },
            None => MessageContent::Text(text.to_string()),
        };
        return Ok(Some(content));
    }

    if let Some(photos) = msg.photo() {
        let content = media::extract_photo_content(bot, photos, msg.caption()).await?;
        return Ok(Some(content));
    }

    if let Some(doc) = msg.document() {
        let content = media::extract_document_content(bot, doc).await?;
        return Ok(Some(content));
    }

    debug!(msg_id = msg.id.0, "ignoring unsupported message type");
    Ok(None)
}

/// Converts a Telegram message and extracted content into an [`InboundMessage`].
///
/// The chat id is kept in metadata so replies reach the same chat.
pub fn to_inbound_message(msg: &Message, content: MessageContent) -> InboundMessage {
    let sender_id = msg
        .from
        .as_ref()
        .map(|u| u.id.0.to_string())
        .unwrap_or_else(|| msg.chat.id.0.to_string());

    let metadata = Some(
        serde_json::json!({
            "chat_id": msg.chat.id.0.to_string(),
        })
        .to_string(),
    );

    InboundMessage {
        id: msg.id.0.to_string(),
        channel: "telegram".to_string(),
        sender_id,
        content,
        timestamp: chrono::DateTime::to_rfc3339(&msg.date),
        metadata,
    }
}
