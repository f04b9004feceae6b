// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Attachment download for Telegram messages.

use casebot_core::CaseError;
use casebot_core::types::MessageContent;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{Document, FileMeta, PhotoSize};
use tracing::debug;

/// Downloads a file from Telegram servers by its file metadata.
pub async fn download_file(bot: &Bot, file_meta: &FileMeta) -> Result<Vec<u8>, CaseError> {
    let file = bot
        .get_file(file_meta.id.clone())
        .await
        .map_err(|e| CaseError::Channel {
            message: format!("failed to get file info: {e}"),
            source: Some(Box::new(e)),
        })?;

    let mut buf = Vec::new();
    bot.download_file(&file.path, &mut buf)
        .await
        .map_err(|e| CaseError::Channel {
            message: format!("failed to download file: {e}"),
            source: Some(Box::new(e)),
        })?;

    debug!(file_id = %file_meta.id, size = buf.len(), "downloaded file from Telegram");
    Ok(buf)
}

/// Downloads the largest size of a photo (the last entry Telegram sends).
pub async fn extract_photo_content(
    bot: &Bot,
    photos: &[PhotoSize],
    caption: Option<&str>,
) -> Result<MessageContent, CaseError> {
    let largest = photos.last().ok_or_else(|| CaseError::Channel {
        message: "photo array is empty".into(),
        source: None,
    })?;

    let data = download_file(bot, &largest.file).await?;
    Ok(MessageContent::Image {
        data,
        mime_type: "image/jpeg".to_string(),
        caption: caption.map(str::to_string),
    })
}

/// Downloads a document attachment, keeping the sender's file name.
pub async fn extract_document_content(
    bot: &Bot,
    doc: &Document,
) -> Result<MessageContent, CaseError> {
    let data = download_file(bot, &doc.file).await?;
    let unique_id = doc.file.unique_id.to_string();
    Ok(MessageContent::Document {
        data,
        filename: document_file_name(doc.file_name.as_deref(), &unique_id),
        mime_type: doc
            .mime_type
            .as_ref()
            .map(|m| m.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string()),
    })
}

/// A storable single-segment file name for a document.
///
/// Path separators and control characters are replaced; documents sent
/// without a name get one derived from Telegram's unique file id.
pub fn document_file_name(original: Option<&str>, unique_id: &str) -> String {
    let cleaned: String = original
        .unwrap_or_default()
        .trim()
        .chars()
        .map(|c| if c == '/' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => format!("document_{unique_id}"),
        _ => cleaned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_plain_names() {
        assert_eq!(document_file_name(Some("doc1.pdf"), "u"), "doc1.pdf");
    }

    #[test]
    fn replaces_path_separators() {
        assert_eq!(
            document_file_name(Some("../etc/passwd"), "u"),
            ".._etc_passwd"
        );
        assert_eq!(document_file_name(Some("a\\b.pdf"), "u"), "a_b.pdf");
    }

    #[test]
    fn unnamed_documents_get_unique_id() {
        assert_eq!(document_file_name(None, "AgAD5"), "document_AgAD5");
        assert_eq!(document_file_name(Some(".."), "AgAD5"), "document_AgAD5");
    }
}
