// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Casebot - Telegram intake bot for motor-insurance claim cases.
//!
//! This is the binary entry point.

mod cases;
mod check;
mod serve;

use std::path::PathBuf;

use casebot_config::CasebotConfig;
use clap::{Parser, Subcommand};

/// Casebot - Telegram intake bot for motor-insurance claim cases.
#[derive(Parser, Debug)]
#[command(name = "casebot", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the bot: long-poll Telegram and process cases.
    Serve,
    /// Load and validate configuration, then print a summary.
    Check,
    /// Inspect persisted cases.
    Cases {
        #[command(subcommand)]
        command: CasesCommand,
    },
}

#[derive(Subcommand, Debug)]
enum CasesCommand {
    /// List cases, newest first.
    List {
        /// Only show cases in this status (received, stored, extracted, reported, failed).
        #[arg(long)]
        status: Option<String>,
        /// Output JSON for scripting.
        #[arg(long)]
        json: bool,
    },
    /// Show one case in full.
    Show {
        /// Case id, e.g. C12.
        id: String,
        #[arg(long)]
        json: bool,
    },
}

fn load_config(path: Option<&PathBuf>) -> CasebotConfig {
    let loaded = match path {
        Some(path) => casebot_config::load_and_validate_path(path),
        None => casebot_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            casebot_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());

    let result = match cli.command {
        Some(Commands::Serve) => {
            if let Err(errors) = casebot_config::validate_for_serve(&config) {
                casebot_config::render_errors(&errors);
                std::process::exit(1);
            }
            serve::run_serve(config).await
        }
        Some(Commands::Check) => {
            check::run_check(&config);
            Ok(())
        }
        Some(Commands::Cases { command }) => match command {
            CasesCommand::List { status, json } => {
                cases::run_list(&config, status.as_deref(), json).await
            }
            CasesCommand::Show { id, json } => cases::run_show(&config, &id, json).await,
        },
        None => {
            println!("casebot: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
