// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapter trait for the chat transport.

use async_trait::async_trait;

use crate::error::CaseError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChannelCapabilities, InboundMessage, MessageId, OutboundMessage};

/// Adapter for a bidirectional chat channel.
///
/// Channel adapters turn platform updates into [`InboundMessage`]s and
/// deliver replies, optionally with a document attached.
#[async_trait]
pub trait ChannelAdapter: PluginAdapter {
    /// Returns the capabilities supported by this channel.
    fn capabilities(&self) -> ChannelCapabilities;

    /// Establishes a connection to the messaging platform.
    async fn connect(&mut self) -> Result<(), CaseError>;

    /// Sends a message through the channel.
    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, CaseError>;

    /// Receives the next inbound message from the channel.
    async fn receive(&self) -> Result<InboundMessage, CaseError>;
}
