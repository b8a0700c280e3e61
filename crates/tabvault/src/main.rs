// SPDX-FileCopyrightText: 2026 TabVault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! TabVault - tab-scoped encrypted credential vault.
//!
//! This is the binary entry point. Each `tabvault shell` process simulates
//! one browser tab with its own session.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod host;
mod prompt;
mod shell;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tabvault_config::TabVaultConfig;
use tabvault_security::{RedactingWriter, RedactionList};

/// TabVault - tab-scoped encrypted credential vault.
#[derive(Parser, Debug)]
#[command(name = "tabvault", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Launch an interactive shell simulating one browser tab.
    Shell,
    /// Validate and print the effective configuration.
    Config {
        /// Print as JSON instead of TOML.
        #[arg(long)]
        json: bool,
    },
    /// Print the SHA-256 fingerprint of a token read from the terminal.
    Fingerprint,
}

/// Install the global subscriber. Every line passes through the redaction
/// list before it reaches stderr.
fn init_tracing(log_level: &str, redactions: RedactionList) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tabvault={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(move || RedactingWriter::new(std::io::stderr(), redactions.clone()))
        .init();
}

fn render_config(config: &TabVaultConfig, json: bool) -> Result<String, String> {
    if json {
        serde_json::to_string_pretty(config).map_err(|e| e.to_string())
    } else {
        toml::to_string_pretty(config).map_err(|e| e.to_string())
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match tabvault_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            tabvault_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let redactions = RedactionList::new();
    init_tracing(&config.logging.level, redactions.clone());

    match cli.command {
        Some(Commands::Shell) => {
            if let Err(e) = shell::run_shell(config, redactions).await {
                eprintln!("{}: {e}", "error".red());
                std::process::exit(1);
            }
        }
        Some(Commands::Config { json }) => match render_config(&config, json) {
            Ok(rendered) => println!("{rendered}"),
            Err(e) => {
                eprintln!("{}: failed to render config: {e}", "error".red());
                std::process::exit(1);
            }
        },
        Some(Commands::Fingerprint) => match prompt::read_token("token: ") {
            Ok(token) => {
                use secrecy::ExposeSecret;
                println!("{}", tabvault_vault::fingerprint(token.expose_secret()));
            }
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                std::process::exit(1);
            }
        },
        None => {
            println!("tabvault: use --help for available commands");
        }
    }
}
