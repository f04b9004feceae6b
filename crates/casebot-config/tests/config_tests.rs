// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Casebot configuration system.

use casebot_config::diagnostic::ConfigError;
use casebot_config::model::{CasebotConfig, StorageBackend};
use casebot_config::{load_and_validate_str, load_config, load_config_from_str};
use figment::Jail;

/// Valid TOML with all known sections deserializes successfully.
#[test]
fn valid_toml_deserializes_into_casebot_config() {
    let toml = r#"
[agent]
name = "claims-desk"
log_level = "debug"
history_limit = 10
response_timeout_secs = 5
report_keywords = ["report"]

[telegram]
bot_token = "123:ABC"
allowed_users = ["alice", "42"]

[llm]
api_key = "sk-123"
model = "gpt-4o"
temperature = 0.5
max_tokens = 512

[storage]
backend = "s3"
max_blob_bytes = 1024

[storage.s3]
bucket = "claims"
region = "eu-west-1"
endpoint = "http://localhost:9000"

[database]
url = "sqlite:///var/lib/casebot/cases.db"
wal_mode = false

[report]
pdf_enabled = false

[[extractor.fields]]
name = "policy_number"
pattern = 'Policy No\.?:\s*(\S+)'
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.agent.name, "claims-desk");
    assert_eq!(config.agent.history_limit, 10);
    assert_eq!(config.agent.report_keywords, vec!["report"]);
    assert_eq!(config.telegram.bot_token.as_deref(), Some("123:ABC"));
    assert_eq!(config.telegram.allowed_users, vec!["alice", "42"]);
    assert_eq!(config.llm.model, "gpt-4o");
    assert_eq!(config.llm.max_tokens, Some(512));
    assert_eq!(config.storage.backend, StorageBackend::S3);
    assert_eq!(config.storage.s3.bucket.as_deref(), Some("claims"));
    assert_eq!(
        config.storage.s3.endpoint.as_deref(),
        Some("http://localhost:9000")
    );
    assert_eq!(config.database.url, "sqlite:///var/lib/casebot/cases.db");
    assert!(!config.database.wal_mode);
    assert!(!config.report.pdf_enabled);
    assert_eq!(config.extractor.fields.len(), 1);
    assert_eq!(config.extractor.fields[0].name, "policy_number");
}

/// Empty TOML falls back to compiled defaults.
#[test]
fn empty_toml_uses_defaults() {
    let config = load_config_from_str("").expect("empty TOML is valid");
    let defaults = CasebotConfig::default();
    assert_eq!(config.agent.history_limit, 24);
    assert_eq!(config.storage.backend, StorageBackend::Local);
    assert_eq!(config.storage.media_dir, defaults.storage.media_dir);
    assert!((config.llm.temperature - 0.2).abs() < f32::EPSILON);
    assert!(config.report.pdf_enabled);
    assert!(config.extractor.fields.is_empty());
    assert!(config.telegram.bot_token.is_none());
}

/// Unknown field in [storage.s3] yields a diagnostic with a suggestion.
#[test]
fn unknown_nested_field_produces_suggestion() {
    let toml = r#"
[storage.s3]
bukcet = "claims"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject unknown field");
    let found = errors.iter().any(|e| {
        matches!(
            e,
            ConfigError::UnknownKey { key, suggestion, .. }
                if key == "bukcet" && suggestion.as_deref() == Some("bucket")
        )
    });
    assert!(found, "expected UnknownKey with suggestion, got: {errors:?}");
}

/// Unknown top-level section is rejected.
#[test]
fn unknown_section_is_rejected() {
    let toml = r#"
[openai]
api_key = "sk"
"#;
    let err = load_config_from_str(toml).expect_err("should reject unknown section");
    assert!(err.to_string().contains("openai"), "got: {err}");
}

/// An unsupported backend name is reported with the accepted values.
#[test]
fn unknown_backend_variant_is_reported() {
    let toml = r#"
[storage]
backend = "ftp"
"#;
    let errors = load_and_validate_str(toml).expect_err("ftp is not a backend");
    let message = errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n");
    assert!(message.contains("ftp"), "got: {message}");
}

/// A rule without a pattern is a missing-key error.
#[test]
fn extractor_rule_requires_pattern() {
    let toml = r#"
[[extractor.fields]]
name = "plate"
"#;
    let errors = load_and_validate_str(toml).expect_err("pattern is required");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::MissingKey { key } if key.ends_with("pattern"))),
        "got: {errors:?}"
    );
}

/// Semantic validation runs after a successful parse.
#[test]
fn validation_runs_after_parse() {
    let toml = r#"
[storage]
backend = "gcs"
"#;
    let errors = load_and_validate_str(toml).expect_err("gcs needs a bucket");
    assert!(errors
        .iter()
        .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("gcs.bucket"))));
}

/// Unprefixed deployment variables populate their keys.
#[test]
fn legacy_env_vars_are_honored() {
    Jail::expect_with(|jail| {
        jail.set_env("TELEGRAM_BOT_TOKEN", "123:legacy");
        jail.set_env("OPENAI_API_KEY", "sk-legacy");
        jail.set_env("STORAGE_BACKEND", "gcs");
        jail.set_env("GCS_BUCKET", "claims-bucket");
        jail.set_env("MEDIA_DIR", "/srv/media");

        let config = load_config()?;
        assert_eq!(config.telegram.bot_token.as_deref(), Some("123:legacy"));
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-legacy"));
        assert_eq!(config.storage.backend, StorageBackend::Gcs);
        assert_eq!(config.storage.gcs.bucket.as_deref(), Some("claims-bucket"));
        assert_eq!(config.storage.media_dir, "/srv/media");
        Ok(())
    });
}

/// `CASEBOT_*` variables override both files and unprefixed variables.
#[test]
fn prefixed_env_overrides_file_and_legacy() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "casebot.toml",
            r#"
[agent]
history_limit = 8

[storage.s3]
bucket = "from-file"
"#,
        )?;
        jail.set_env("MEDIA_DIR", "/legacy/media");
        jail.set_env("CASEBOT_STORAGE_MEDIA_DIR", "/prefixed/media");
        jail.set_env("CASEBOT_STORAGE_S3_BUCKET", "from-env");

        let config = load_config()?;
        assert_eq!(config.agent.history_limit, 8);
        assert_eq!(config.storage.media_dir, "/prefixed/media");
        assert_eq!(config.storage.s3.bucket.as_deref(), Some("from-env"));
        Ok(())
    });
}

/// A deployment `DATABASE_URL` pointing at a server database is fatal.
#[test]
fn legacy_postgres_database_url_fails_validation() {
    Jail::expect_with(|jail| {
        jail.set_env("DATABASE_URL", "postgresql://user:pass@db:5432/claims");

        let errors = casebot_config::load_and_validate().expect_err("postgres is not SQLite");
        assert!(errors.iter().any(|e| matches!(
            e,
            ConfigError::Validation { message } if message.contains("database.url")
        )));
        Ok(())
    });
}
