// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./casebot.toml` > `~/.config/casebot/casebot.toml` > `/etc/casebot/casebot.toml`
//! with environment variable overrides via the `CASEBOT_` prefix. The plain
//! variable names of earlier deployments (`TELEGRAM_BOT_TOKEN`,
//! `OPENAI_API_KEY`, `MEDIA_DIR`, ...) are honored below the prefixed ones.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::CasebotConfig;

/// Unprefixed environment variables and the keys they set.
const LEGACY_ENV_KEYS: &[(&str, &str)] = &[
    ("telegram_bot_token", "telegram.bot_token"),
    ("openai_api_key", "llm.api_key"),
    ("storage_backend", "storage.backend"),
    ("media_dir", "storage.media_dir"),
    ("database_url", "database.url"),
    ("s3_bucket", "storage.s3.bucket"),
    ("aws_region", "storage.s3.region"),
    ("aws_access_key_id", "storage.s3.access_key_id"),
    ("aws_secret_access_key", "storage.s3.secret_access_key"),
    ("gcs_bucket", "storage.gcs.bucket"),
    ("google_application_credentials", "storage.gcs.service_account_path"),
];

/// Section prefixes of `CASEBOT_*` variables, longest first.
const SECTION_PREFIXES: &[(&str, &str)] = &[
    ("storage_s3_", "storage.s3."),
    ("storage_gcs_", "storage.gcs."),
    ("agent_", "agent."),
    ("telegram_", "telegram."),
    ("llm_", "llm."),
    ("storage_", "storage."),
    ("database_", "database."),
    ("report_", "report."),
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/casebot/casebot.toml` (system-wide)
/// 3. `~/.config/casebot/casebot.toml` (user XDG config)
/// 4. `./casebot.toml` (local directory)
/// 5. Unprefixed deployment variables (`TELEGRAM_BOT_TOKEN`, ...)
/// 6. `CASEBOT_*` environment variables
pub fn load_config() -> Result<CasebotConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<CasebotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CasebotConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<CasebotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CasebotConfig::default()))
        .merge(Toml::file(path))
        .merge(legacy_env_provider())
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(CasebotConfig::default()))
        .merge(Toml::file("/etc/casebot/casebot.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("casebot/casebot.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("casebot.toml"))
        .merge(legacy_env_provider())
        .merge(env_provider())
}

/// Maps a lowercased, prefix-stripped `CASEBOT_*` name to a dotted key.
///
/// Uses explicit section prefixes rather than splitting on `_`, so
/// `CASEBOT_TELEGRAM_BOT_TOKEN` maps to `telegram.bot_token`, not
/// `telegram.bot.token`.
pub fn map_env_key(key: &str) -> String {
    for (prefix, section) in SECTION_PREFIXES {
        if let Some(rest) = key.strip_prefix(prefix) {
            return format!("{section}{rest}");
        }
    }
    key.to_string()
}

fn env_provider() -> Env {
    Env::prefixed("CASEBOT_").map(|key| map_env_key(&key.as_str().to_ascii_lowercase()).into())
}

fn legacy_env_provider() -> Env {
    let names: Vec<&str> = LEGACY_ENV_KEYS.iter().map(|(name, _)| *name).collect();
    Env::raw().only(&names).map(|key| {
        let key_str = key.as_str().to_ascii_lowercase();
        LEGACY_ENV_KEYS
            .iter()
            .find(|(name, _)| *name == key_str)
            .map(|(_, mapped)| (*mapped).to_string())
            .unwrap_or(key_str)
            .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_keys_map_to_sections() {
        assert_eq!(map_env_key("telegram_bot_token"), "telegram.bot_token");
        assert_eq!(map_env_key("llm_api_key"), "llm.api_key");
        assert_eq!(map_env_key("storage_media_dir"), "storage.media_dir");
        assert_eq!(map_env_key("storage_s3_bucket"), "storage.s3.bucket");
        assert_eq!(map_env_key("storage_gcs_bucket"), "storage.gcs.bucket");
        assert_eq!(map_env_key("agent_history_limit"), "agent.history_limit");
        assert_eq!(map_env_key("database_url"), "database.url");
    }

    #[test]
    fn legacy_names_are_unique() {
        for (i, (name, _)) in LEGACY_ENV_KEYS.iter().enumerate() {
            assert!(
                !LEGACY_ENV_KEYS[i + 1..].iter().any(|(other, _)| other == name),
                "duplicate legacy env name {name}"
            );
        }
    }
}
