// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `casebot serve` command implementation.
//!
//! Wires storage, blob backend, extractor, report generator, language model,
//! and the Telegram channel into the intake loop, then runs until SIGINT or
//! SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use casebot_blob::build_blob_store;
use casebot_config::CasebotConfig;
use casebot_core::{
    BlobStore, CaseError, ChannelAdapter, HealthStatus, PdfCapability, PluginAdapter,
};
use casebot_extract::PdfFieldExtractor;
use casebot_intake::shutdown::install_signal_handler;
use casebot_intake::{IntakeDeps, IntakeHandler, IntakeLoop, IntakeSettings};
use casebot_llm::OpenAiProvider;
use casebot_report::{ReportGenerator, detect_capability};
use casebot_storage::SqliteStorage;
use casebot_telegram::TelegramChannel;
use tracing::{info, warn};

/// Runs the bot until a shutdown signal arrives.
pub async fn run_serve(config: CasebotConfig) -> Result<(), CaseError> {
    init_tracing(&config.agent.log_level);

    info!(name = %config.agent.name, "starting casebot serve");

    let storage = Arc::new(SqliteStorage::new(config.database.clone()));
    storage.initialize().await?;
    info!(url = %config.database.url, "case database ready");

    let blobs = build_blob_store(&config.storage)?;
    report_health(blobs.as_ref()).await;

    let extractor = Arc::new(PdfFieldExtractor::new(&config.extractor.fields)?);

    let capability = detect_capability(&config.report);
    if capability == PdfCapability::Unavailable {
        warn!("reports will be sent as plain text");
    }
    let renderer = Arc::new(ReportGenerator::new(config.agent.name.clone(), capability));

    let response_timeout = Duration::from_secs(config.agent.response_timeout_secs);
    let provider = Arc::new(OpenAiProvider::new(
        &config.llm,
        config.agent.system_prompt.clone(),
        response_timeout,
    )?);

    let mut telegram = TelegramChannel::new(config.telegram.clone())?;
    telegram.connect().await?;
    let channel: Arc<dyn ChannelAdapter> = Arc::new(telegram);

    let handler = Arc::new(IntakeHandler::new(
        IntakeDeps {
            channel: channel.clone(),
            blobs,
            repository: storage.clone(),
            conversation: storage,
            extractor,
            renderer,
            provider,
        },
        IntakeSettings::from_config(&config.agent),
    ));

    let cancel = install_signal_handler();
    IntakeLoop::new(channel, handler).run(cancel).await?;

    info!("casebot stopped");
    Ok(())
}

async fn report_health(blobs: &dyn BlobStore) {
    match blobs.health_check().await {
        Ok(HealthStatus::Healthy) => info!(backend = blobs.name(), "blob store ready"),
        Ok(HealthStatus::Degraded(reason)) | Ok(HealthStatus::Unhealthy(reason)) => {
            warn!(backend = blobs.name(), reason = %reason, "blob store not healthy at startup")
        }
        Err(e) => warn!(backend = blobs.name(), error = %e, "blob store health check failed"),
    }
}

/// Initialize the tracing subscriber with the configured log level.
///
/// `RUST_LOG` takes precedence when set.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("casebot={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
