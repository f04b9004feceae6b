// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the intake pipeline collaborators.
//!
//! Adapters with identity and lifecycle extend the [`PluginAdapter`] base
//! trait. All async traits use `#[async_trait]` for dynamic dispatch.

pub mod adapter;
pub mod blob;
pub mod channel;
pub mod extract;
pub mod provider;
pub mod report;
pub mod repository;

pub use adapter::PluginAdapter;
pub use blob::BlobStore;
pub use channel::ChannelAdapter;
pub use extract::DocumentExtractor;
pub use provider::ProviderAdapter;
pub use report::ReportRenderer;
pub use repository::{CaseRepository, ConversationStore};
