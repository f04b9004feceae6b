// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Intake handler and receive loop for the Casebot intake bot.
//!
//! The [`IntakeLoop`] pulls events from a [`ChannelAdapter`] and hands each
//! one to the [`IntakeHandler`] on its own task, so a slow case never blocks
//! intake for other senders. Attachments go through the [`CasePipeline`];
//! text goes to the language model with the sender's recent history.

pub mod handler;
pub mod locks;
pub mod pipeline;
pub mod shutdown;

use std::sync::Arc;
use std::time::Duration;

use casebot_core::{CaseError, ChannelAdapter};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info};

pub use handler::{IntakeDeps, IntakeHandler, IntakeSettings, STILL_PROCESSING};
pub use locks::CaseLocks;
pub use pipeline::{Attachment, CasePipeline, PipelineFailure, PipelineOutcome};

/// Receive loop: one tracked task per inbound event.
pub struct IntakeLoop {
    channel: Arc<dyn ChannelAdapter>,
    handler: Arc<IntakeHandler>,
    tracker: TaskTracker,
    drain_timeout: Duration,
}

impl IntakeLoop {
    /// `channel` must already be connected; the handler replies through the
    /// same adapter.
    pub fn new(channel: Arc<dyn ChannelAdapter>, handler: Arc<IntakeHandler>) -> Self {
        Self {
            channel,
            handler,
            tracker: TaskTracker::new(),
            drain_timeout: shutdown::DRAIN_TIMEOUT,
        }
    }

    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Number of events currently being handled.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Runs until `cancel` fires or the channel closes, then drains in-flight
    /// events and shuts the collaborators down.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), CaseError> {
        info!("intake loop running");

        loop {
            tokio::select! {
                msg = self.channel.receive() => {
                    match msg {
                        Ok(inbound) => {
                            let handler = self.handler.clone();
                            self.tracker.spawn(async move {
                                let id = inbound.id.clone();
                                if let Err(e) = handler.handle(inbound).await {
                                    error!(id = id.as_str(), error = %e, "failed to handle inbound event");
                                }
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "channel receive failed, stopping intake loop");
                            break;
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping intake loop");
                    break;
                }
            }
        }

        shutdown::drain_tasks(&self.tracker, self.drain_timeout).await;
        self.handler.shutdown().await?;

        info!("intake loop stopped");
        Ok(())
    }
}
