// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Casebot integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without Telegram or a model API.
//!
//! # Components
//!
//! - [`MockProvider`] - Mock language model with pre-configured responses
//! - [`MockChannel`] - Mock chat channel with message injection and capture
//! - [`RecordingRepository`] - Repository wrapper recording each case's statuses
//! - [`TestHarness`] - The full intake stack over temp storage

pub mod harness;
pub mod mock_channel;
pub mod mock_provider;
pub mod recording;

pub use harness::{TestHarness, make_pdf};
pub use mock_channel::MockChannel;
pub use mock_provider::MockProvider;
pub use recording::RecordingRepository;
