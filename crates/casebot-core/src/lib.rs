// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Casebot intake bot.
//!
//! This crate provides the case model, the error taxonomy, and the adapter
//! traits implemented by the blob store, repository, report, extraction,
//! channel, and provider crates.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{CaseError, ErrorKind};
pub use types::{
    AdapterType, Case, CaseId, CasePatch, CaseStatus, HealthStatus, Locator, PdfCapability,
    RenderedReport, ReportFormat, WriteMode,
};

// Re-export all adapter traits at crate root.
pub use traits::{
    BlobStore, CaseRepository, ChannelAdapter, ConversationStore, DocumentExtractor,
    PluginAdapter, ProviderAdapter, ReportRenderer,
};
