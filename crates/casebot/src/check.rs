// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `casebot check` command implementation.
//!
//! The configuration has already been loaded and validated by the time this
//! runs; it prints what `serve` would use and whether credentials are set.

use std::io::IsTerminal;

use casebot_config::CasebotConfig;
use casebot_config::model::StorageBackend;
use colored::Colorize;

/// Label/value pairs describing the effective configuration.
fn summary(config: &CasebotConfig) -> Vec<(&'static str, String)> {
    let location = match config.storage.backend {
        StorageBackend::Local => config.storage.media_dir.clone(),
        StorageBackend::S3 => format!(
            "s3://{}",
            config.storage.s3.bucket.as_deref().unwrap_or_default()
        ),
        StorageBackend::Gcs => format!(
            "gcs://{}",
            config.storage.gcs.bucket.as_deref().unwrap_or_default()
        ),
    };
    vec![
        ("Bot", config.agent.name.clone()),
        ("Storage", format!("{} ({location})", config.storage.backend)),
        ("Database", config.database.url.clone()),
        ("Model", format!("{} at {}", config.llm.model, config.llm.base_url)),
        (
            "Reports",
            if config.report.pdf_enabled { "pdf" } else { "text" }.to_string(),
        ),
        (
            "Extraction",
            format!("{} rule(s)", config.extractor.fields.len()),
        ),
        (
            "Allowed users",
            if config.telegram.allowed_users.is_empty() {
                "everyone".to_string()
            } else {
                config.telegram.allowed_users.join(", ")
            },
        ),
    ]
}

/// Run the `casebot check` command.
pub fn run_check(config: &CasebotConfig) {
    let use_color = std::io::stdout().is_terminal();

    println!();
    println!("  casebot check");
    println!("  {}", "-".repeat(35));
    for (label, value) in summary(config) {
        println!("    {:<14}{value}", format!("{label}:"));
    }
    println!();

    match casebot_config::validate_for_serve(config) {
        Ok(()) => {
            if use_color {
                println!("    {} configuration is ready to serve", "✓".green());
            } else {
                println!("    [OK] configuration is ready to serve");
            }
        }
        Err(errors) => {
            for error in &errors {
                if use_color {
                    println!("    {} {error}", "✗".red());
                } else {
                    println!("    [FAIL] {error}");
                }
            }
            println!();
            println!("  `casebot serve` will refuse to start until these are set.");
        }
    }
    println!();
}
