// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the intake pipeline.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{CaseError, ErrorKind};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Channel,
    Provider,
    BlobStore,
    Repository,
}

// --- Case model ---

/// Opaque case identifier assigned by the repository (`C1`, `C2`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseId(pub String);

impl CaseId {
    /// Builds the identifier for a database row id.
    pub fn from_row_id(row_id: i64) -> Self {
        Self(format!("C{row_id}"))
    }

    /// Returns the database row id encoded in this identifier, if it is in
    /// the canonical `C<n>` form: ASCII digits only, no sign or leading zero.
    pub fn row_id(&self) -> Option<i64> {
        let digits = self.0.strip_prefix('C')?;
        if digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a case.
///
/// Valid transitions:
/// - `received` -> `stored`
/// - `stored` -> `extracted` | `reported`
/// - `extracted` -> `reported`
/// - any non-terminal state -> `failed`
///
/// `reported` and `failed` are terminal.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    Received,
    Stored,
    Extracted,
    Reported,
    Failed,
}

impl CaseStatus {
    /// Returns `true` if no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, CaseStatus::Reported | CaseStatus::Failed)
    }

    /// Returns `true` if moving from `self` to `next` follows the forward sequence.
    pub fn can_transition_to(self, next: CaseStatus) -> bool {
        use CaseStatus::*;
        match (self, next) {
            (Received, Stored) => true,
            (Stored, Extracted) | (Stored, Reported) => true,
            (Extracted, Reported) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

/// Backend-qualified reference to a stored blob.
///
/// Formats: `local:///abs/path`, `s3://bucket/key`, `gcs://bucket/key`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator(pub String);

impl Locator {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The scheme part before `://`, if any.
    pub fn scheme(&self) -> Option<&str> {
        self.0.split_once("://").map(|(scheme, _)| scheme)
    }

    /// The final path segment, used as a file name when sending the blob back.
    ///
    /// Object-store keys are percent-encoded; the name is decoded so users
    /// see the file name they uploaded.
    pub fn file_name(&self) -> Cow<'_, str> {
        let raw = self.0.rsplit('/').next().unwrap_or(&self.0);
        match self.scheme() {
            Some("s3" | "gcs") => percent_decode_str(raw).decode_utf8_lossy(),
            _ => Cow::Borrowed(raw),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Collision policy for blob writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Fail with `BlobConflict` if different content already exists under the name.
    CreateNew,
    /// Replace any existing blob.
    Overwrite,
}

/// Output format of a rendered report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Pdf,
    Text,
}

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Pdf => "pdf",
            ReportFormat::Text => "txt",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ReportFormat::Pdf => "application/pdf",
            ReportFormat::Text => "text/plain; charset=utf-8",
        }
    }
}

/// A rendered report document.
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub bytes: Vec<u8>,
    pub format: ReportFormat,
}

/// Whether PDF rendering can be used, decided once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfCapability {
    Available,
    Unavailable,
}

/// A tracked unit of intake work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub case_id: CaseId,
    pub sender_id: String,
    pub title: Option<String>,
    pub status: CaseStatus,
    pub file_refs: Vec<Locator>,
    pub extracted_fields: BTreeMap<String, String>,
    pub report_ref: Option<Locator>,
    pub report_format: Option<ReportFormat>,
    pub failure_kind: Option<ErrorKind>,
    pub failure_message: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Case {
    /// Merges a partial update into this case.
    ///
    /// The status transition is checked before anything is changed, so a
    /// rejected patch leaves the case untouched. File refs are appended
    /// (duplicates skipped) and extracted fields merge per key, the patch
    /// value winning.
    pub fn apply(&mut self, patch: CasePatch, now: &str) -> Result<(), CaseError> {
        if let Some(next) = patch.status
            && !self.status.can_transition_to(next)
        {
            return Err(CaseError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        if patch.status.is_none() && self.status.is_terminal() && !patch.is_empty() {
            return Err(CaseError::InvalidInput(format!(
                "case {} is {} and can no longer change",
                self.case_id, self.status
            )));
        }

        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(title) = patch.title {
            self.title = Some(title);
        }
        for locator in patch.file_refs {
            if !self.file_refs.contains(&locator) {
                self.file_refs.push(locator);
            }
        }
        self.extracted_fields.extend(patch.extracted_fields);
        if let Some((locator, format)) = patch.report {
            self.report_ref = Some(locator);
            self.report_format = Some(format);
        }
        if let Some((kind, message)) = patch.failure {
            self.failure_kind = Some(kind);
            self.failure_message = Some(message);
        }
        self.updated_at = now.to_string();
        Ok(())
    }
}

/// A partial update to a [`Case`]. Unset fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CasePatch {
    pub status: Option<CaseStatus>,
    pub title: Option<String>,
    pub file_refs: Vec<Locator>,
    pub extracted_fields: BTreeMap<String, String>,
    pub report: Option<(Locator, ReportFormat)>,
    pub failure: Option<(ErrorKind, String)>,
}

impl CasePatch {
    pub fn status(status: CaseStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// A patch moving the case to `failed`, recording the error kind and message.
    pub fn failed(err: &CaseError) -> Self {
        Self {
            status: Some(CaseStatus::Failed),
            failure: Some((err.kind(), err.to_string())),
            ..Self::default()
        }
    }

    pub fn with_file_ref(mut self, locator: Locator) -> Self {
        self.file_refs.push(locator);
        self
    }

    pub fn with_fields(mut self, fields: BTreeMap<String, String>) -> Self {
        self.extracted_fields.extend(fields);
        self
    }

    pub fn with_report(mut self, locator: Locator, format: ReportFormat) -> Self {
        self.report = Some((locator, format));
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

// --- Conversation model ---

/// Author of a conversation message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A persisted conversation message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub sender_id: String,
    pub role: ChatRole,
    pub content: String,
    pub created_at: String,
}

// --- Channel types ---

/// Content of an inbound chat message.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageContent {
    /// Plain text.
    Text(String),
    /// A bot command such as `/newcase Rear bumper`; `name` has no leading slash.
    Command { name: String, args: String },
    /// A photo, downloaded at the largest available size.
    Image {
        data: Vec<u8>,
        mime_type: String,
        caption: Option<String>,
    },
    /// A file attachment.
    Document {
        data: Vec<u8>,
        filename: String,
        mime_type: String,
    },
}

/// An inbound message received from a channel adapter.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub id: String,
    pub channel: String,
    pub sender_id: String,
    pub content: MessageContent,
    pub timestamp: String,
    /// JSON routing data (e.g. `{"chat_id": "..."}`) echoed on replies.
    pub metadata: Option<String>,
}

/// A file attached to an outbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundDocument {
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// An outbound message to be sent via a channel adapter.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub channel: String,
    pub content: String,
    pub document: Option<OutboundDocument>,
    pub metadata: Option<String>,
}

impl OutboundMessage {
    /// Builds a text reply routed back to the sender of `inbound`.
    pub fn reply_to(inbound: &InboundMessage, content: impl Into<String>) -> Self {
        Self {
            channel: inbound.channel.clone(),
            content: content.into(),
            document: None,
            metadata: inbound.metadata.clone(),
        }
    }

    pub fn with_document(mut self, document: OutboundDocument) -> Self {
        self.document = Some(document);
        self
    }
}

/// Unique identifier for a sent message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Capabilities reported by a channel adapter.
#[derive(Debug, Clone)]
pub struct ChannelCapabilities {
    pub supports_images: bool,
    pub supports_documents: bool,
    pub max_message_length: Option<usize>,
}

// --- Provider types ---

/// A single turn sent to the language model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderMessage {
    pub role: ChatRole,
    pub content: String,
}

/// A request to a language-model provider.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub system_prompt: Option<String>,
    pub messages: Vec<ProviderMessage>,
}

/// A response from a language-model provider.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub content: String,
    pub model: String,
}
