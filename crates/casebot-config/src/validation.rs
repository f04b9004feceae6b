// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as backend-specific required settings and compilable extraction rules.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::{CasebotConfig, StorageBackend};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &CasebotConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.agent.log_level.as_str()) {
        fail(format!(
            "agent.log_level must be one of {}, got `{}`",
            LOG_LEVELS.join(", "),
            config.agent.log_level
        ));
    }
    if config.agent.history_limit == 0 {
        fail("agent.history_limit must be at least 1".to_string());
    }
    if config.agent.response_timeout_secs == 0 {
        fail("agent.response_timeout_secs must be at least 1".to_string());
    }

    if !(0.0..=2.0).contains(&config.llm.temperature) {
        fail(format!(
            "llm.temperature must be between 0.0 and 2.0, got {}",
            config.llm.temperature
        ));
    }
    if !config.llm.base_url.starts_with("http://") && !config.llm.base_url.starts_with("https://")
    {
        fail(format!(
            "llm.base_url `{}` must start with http:// or https://",
            config.llm.base_url
        ));
    }

    if config.storage.max_blob_bytes == 0 {
        fail("storage.max_blob_bytes must be greater than 0".to_string());
    }
    match config.storage.backend {
        StorageBackend::Local => {
            if config.storage.media_dir.trim().is_empty() {
                fail("storage.media_dir must not be empty for the local backend".to_string());
            }
        }
        StorageBackend::S3 => {
            let s3 = &config.storage.s3;
            if is_blank(&s3.bucket) {
                fail("storage.s3.bucket is required when storage.backend = \"s3\"".to_string());
            }
            if is_blank(&s3.access_key_id) != is_blank(&s3.secret_access_key) {
                fail(
                    "storage.s3.access_key_id and storage.s3.secret_access_key must be set together"
                        .to_string(),
                );
            }
        }
        StorageBackend::Gcs => {
            if is_blank(&config.storage.gcs.bucket) {
                fail("storage.gcs.bucket is required when storage.backend = \"gcs\"".to_string());
            }
        }
    }

    let database_url = config.database.url.trim();
    if database_url.is_empty() {
        fail("database.url must not be empty".to_string());
    } else if let Some((scheme, _)) = database_url.split_once("://")
        && scheme != "sqlite"
    {
        fail(format!(
            "database.url scheme `{scheme}://` is not supported (only SQLite: a path, sqlite://path, or :memory:)"
        ));
    }

    let mut seen_names = HashSet::new();
    for (i, rule) in config.extractor.fields.iter().enumerate() {
        if rule.name.trim().is_empty() {
            fail(format!("extractor.fields[{i}].name must not be empty"));
        } else if !seen_names.insert(rule.name.as_str()) {
            fail(format!(
                "duplicate field name `{}` in [[extractor.fields]]",
                rule.name
            ));
        }
        if let Err(e) = regex::Regex::new(&rule.pattern) {
            fail(format!(
                "extractor.fields[{i}].pattern is not a valid regex: {e}"
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check the credentials `casebot serve` cannot run without.
///
/// Kept apart from [`validate_config`] so offline commands (`check`,
/// `cases`) work on a machine without secrets.
pub fn validate_for_serve(config: &CasebotConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    if is_blank(&config.telegram.bot_token) {
        errors.push(ConfigError::MissingCredential {
            key: "telegram.bot_token".to_string(),
            env_var: "TELEGRAM_BOT_TOKEN",
        });
    }
    if is_blank(&config.llm.api_key) {
        errors.push(ConfigError::MissingCredential {
            key: "llm.api_key".to_string(),
            env_var: "OPENAI_API_KEY",
        });
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}
