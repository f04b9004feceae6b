// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Casebot intake bot.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Casebot configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CasebotConfig {
    /// Bot identity and conversation settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Telegram bot integration settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Language-model API settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Blob storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Case database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Report generation settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// PDF field extraction rules.
    #[serde(default)]
    pub extractor: ExtractorConfig,
}

/// Bot identity and conversation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the bot, printed on reports.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// System prompt sent ahead of every conversation.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Number of past messages per sender kept as model context.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Seconds to wait for a pipeline before replying that it is still running.
    #[serde(default = "default_response_timeout_secs")]
    pub response_timeout_secs: u64,

    /// Case-insensitive phrases that turn a chat answer into a report document.
    #[serde(default = "default_report_keywords")]
    pub report_keywords: Vec<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            system_prompt: default_system_prompt(),
            history_limit: default_history_limit(),
            response_timeout_secs: default_response_timeout_secs(),
            report_keywords: default_report_keywords(),
        }
    }
}

fn default_agent_name() -> String {
    "casebot".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_system_prompt() -> String {
    "You are an expert motor-insurance claims assessment assistant. \
     Answer briefly, precisely, and with a professional focus. \
     When a report is requested, summarize the assessment so it can be printed."
        .to_string()
}

fn default_history_limit() -> usize {
    24
}

fn default_response_timeout_secs() -> u64 {
    30
}

fn default_report_keywords() -> Vec<String> {
    vec!["báo cáo".to_string(), "report".to_string()]
}

/// Telegram bot integration configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. Required by `casebot serve`.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Telegram user IDs or usernames allowed to talk to the bot.
    /// An empty list accepts every sender.
    #[serde(default)]
    pub allowed_users: Vec<String>,
}

/// OpenAI-compatible chat-completions API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    /// API key. Required by `casebot serve`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// API base URL; `/chat/completions` is appended.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate per answer. Omitted from requests when unset.
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: None,
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

/// Which blob backend stores attachments and reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Local,
    S3,
    Gcs,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::Local => f.write_str("local"),
            StorageBackend::S3 => f.write_str("s3"),
            StorageBackend::Gcs => f.write_str("gcs"),
        }
    }
}

/// Blob storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Selected backend.
    #[serde(default)]
    pub backend: StorageBackend,

    /// Root directory for the local backend.
    #[serde(default = "default_media_dir")]
    pub media_dir: String,

    /// Largest accepted blob in bytes.
    #[serde(default = "default_max_blob_bytes")]
    pub max_blob_bytes: u64,

    /// S3-compatible backend settings.
    #[serde(default)]
    pub s3: S3Config,

    /// GCS backend settings.
    #[serde(default)]
    pub gcs: GcsConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            media_dir: default_media_dir(),
            max_blob_bytes: default_max_blob_bytes(),
            s3: S3Config::default(),
            gcs: GcsConfig::default(),
        }
    }
}

fn default_media_dir() -> String {
    "/tmp/telegram_media".to_string()
}

fn default_max_blob_bytes() -> u64 {
    // Telegram bots cannot download files above 20 MiB.
    20 * 1024 * 1024
}

/// S3-compatible object store settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct S3Config {
    #[serde(default)]
    pub bucket: Option<String>,

    #[serde(default)]
    pub region: Option<String>,

    /// Custom endpoint for MinIO, R2, and similar services.
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub access_key_id: Option<String>,

    #[serde(default)]
    pub secret_access_key: Option<String>,
}

/// Google Cloud Storage settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GcsConfig {
    #[serde(default)]
    pub bucket: Option<String>,

    /// Path to a service account JSON key file.
    #[serde(default)]
    pub service_account_path: Option<String>,
}

/// Case database configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// SQLite location: a path, `sqlite://path`, or `:memory:`.
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_url() -> String {
    dirs::data_dir()
        .map(|p| p.join("casebot").join("casebot.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("casebot.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Report generation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    /// Produce PDF reports. When `false` every report is plain text.
    #[serde(default = "default_pdf_enabled")]
    pub pdf_enabled: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            pdf_enabled: default_pdf_enabled(),
        }
    }
}

fn default_pdf_enabled() -> bool {
    true
}

/// PDF field extraction configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractorConfig {
    /// Rules applied to the text of uploaded PDFs. Empty by default.
    #[serde(default)]
    pub fields: Vec<FieldRule>,
}

/// A single extraction rule: the first match of `pattern` becomes the value of `name`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FieldRule {
    /// Field name stored in the case.
    pub name: String,

    /// Regular expression; capture group 1 is used when present.
    pub pattern: String,
}
