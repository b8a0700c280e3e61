// SPDX-FileCopyrightText: 2026 TabVault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tabvault shell` command implementation.
//!
//! One shell process is one browser tab: a fresh session on start, a
//! background ticker for rotation and validation, and readline history.
//! When the monitor asks the host to reload, the shell rebuilds the session.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use secrecy::{ExposeSecret, SecretString};
use tabvault_config::TabVaultConfig;
use tabvault_core::{Severity, VaultError};
use tabvault_security::{RedactionList, SecurityReport};
use tabvault_session::{TabSession, TickReport, spawn_ticker};
use tabvault_vault::mask_secret;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::host::{ProcessHost, tab_host};
use crate::prompt;

/// How often the background ticker asks the scheduler for due checks.
const TICK_PERIOD: Duration = Duration::from_secs(1);

const HELP: &str = "\
commands:
  store <username>   encrypt and store a credential (token read without echo)
  retrieve           decrypt the stored credential and show it masked
  status             expiry, fingerprint and key version of the stored credential
  clear              remove the stored credential and key material
  report             security report for this session
  tick               run any periodic checks that are due now
  invalidate         log out: wipe everything and reload the tab
  reload             start a fresh session, as a page reload would
  help               show this help
  quit               exit the shell";

/// A parsed shell input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Store { username: String },
    Retrieve,
    Status,
    Clear,
    Report,
    Tick,
    Invalidate,
    Reload,
    Help,
    Quit,
}

impl FromStr for ShellCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let verb = parts.next().unwrap_or_default();
        let command = match verb.trim_start_matches('/') {
            "store" => {
                let username = parts
                    .next()
                    .ok_or_else(|| "usage: store <username>".to_string())?;
                ShellCommand::Store {
                    username: username.to_string(),
                }
            }
            "retrieve" | "get" => ShellCommand::Retrieve,
            "status" => ShellCommand::Status,
            "clear" => ShellCommand::Clear,
            "report" => ShellCommand::Report,
            "tick" => ShellCommand::Tick,
            "invalidate" | "logout" => ShellCommand::Invalidate,
            "reload" => ShellCommand::Reload,
            "help" | "?" => ShellCommand::Help,
            "quit" | "exit" => ShellCommand::Quit,
            other => return Err(format!("unknown command `{other}` (try `help`)")),
        };
        if parts.next().is_some() {
            return Err(format!("too many arguments for `{verb}`"));
        }
        Ok(command)
    }
}

/// Run one command against the session and render its output.
///
/// `token` must be supplied for [`ShellCommand::Store`]; it is read before
/// the session lock is taken so the ticker keeps running during the prompt.
pub async fn execute(
    session: &mut TabSession,
    command: ShellCommand,
    token: Option<SecretString>,
) -> Result<String, VaultError> {
    match command {
        ShellCommand::Store { username } => {
            let token =
                token.ok_or_else(|| VaultError::Internal("no token provided".to_string()))?;
            session.store(&username, token).await?;
            Ok(format!("stored credential for {}", username.bold()))
        }
        ShellCommand::Retrieve => match session.retrieve().await? {
            Some(credential) => Ok(format!(
                "{}  {}",
                credential.username.bold(),
                mask_secret(credential.token.expose_secret())
            )),
            None => Ok("no credential stored".dimmed().to_string()),
        },
        ShellCommand::Status => match session.status()? {
            Some(status) => Ok(format!(
                "fingerprint    {}\nkey version    {}\nexpires at     {}\nnext rotation  {}",
                tabvault_vault::fingerprint::short(&status.fingerprint),
                status.key_version,
                status.expires_at.to_rfc3339(),
                status.next_rotation.to_rfc3339()
            )),
            None => Ok("no credential stored".dimmed().to_string()),
        },
        ShellCommand::Clear => {
            session.clear()?;
            Ok("credential cleared".to_string())
        }
        ShellCommand::Report => Ok(render_report(&session.security_report())),
        ShellCommand::Tick => Ok(render_tick(&session.tick().await)),
        ShellCommand::Invalidate => {
            session.invalidate("explicit logout");
            Ok("session invalidated".yellow().to_string())
        }
        ShellCommand::Reload => {
            session.reload();
            Ok(format!("new session {}", session.monitor().session_id()))
        }
        ShellCommand::Help => Ok(HELP.to_string()),
        ShellCommand::Quit => Ok(String::new()),
    }
}

fn severity_label(severity: Severity) -> String {
    let label = format!("{severity:<8}");
    match severity {
        Severity::Low => label.dimmed().to_string(),
        Severity::Medium => label.yellow().to_string(),
        Severity::High => label.red().to_string(),
        Severity::Critical => label.red().bold().to_string(),
    }
}

fn render_report(report: &SecurityReport) -> String {
    let summary = &report.summary;
    let mut out = format!(
        "session {} ({})\naccesses {}/{} ({} remaining)\nage {}s, idle {}s{}\nevents {} retained, {} total, {} evicted\nseverity low={} medium={} high={} critical={}",
        report.session_info.id,
        summary.state,
        summary.access_count,
        summary.access_ceiling,
        summary.access_remaining,
        summary.session_age_secs,
        summary.idle_secs,
        if summary.devtools_suspected {
            ", devtools suspected"
        } else {
            ""
        },
        summary.events_retained,
        summary.events_total,
        summary.events_evicted,
        summary.severity.low,
        summary.severity.medium,
        summary.severity.high,
        summary.severity.critical,
    );
    for event in &report.recent_events {
        out.push_str(&format!(
            "\n  {} {} {:<22} {}",
            event.timestamp.format("%H:%M:%S"),
            severity_label(event.severity),
            event.kind.to_string(),
            event.details
        ));
    }
    out
}

fn render_tick(report: &TickReport) -> String {
    if report.ran.is_empty() {
        return "nothing due".dimmed().to_string();
    }
    let mut lines: Vec<String> = report.ran.iter().map(|task| format!("ran {task}")).collect();
    if let Some(version) = report.rotated_to {
        lines.push(format!("rotated to key version {version}"));
    }
    if report.session_valid == Some(false) {
        lines.push("session failed validation".red().to_string());
    }
    if report.devtools_suspected == Some(true) {
        lines.push("developer tools suspected".yellow().to_string());
    }
    lines.join("\n")
}

/// Print the outcome of one command. A fatal error is handed back instead
/// of printed; the shell stops on it.
fn print_outcome(outcome: Result<String, VaultError>) -> Option<VaultError> {
    match outcome {
        Ok(output) if output.is_empty() => None,
        Ok(output) => {
            println!("{output}");
            None
        }
        Err(e) if e.is_fatal() => Some(e),
        Err(e) => {
            eprintln!("{}: {e}", "error".red());
            None
        }
    }
}

/// Rebuild the session if the monitor requested a reload. Returns true if it did.
fn apply_pending_reload(env: &ProcessHost, session: &mut TabSession) -> bool {
    if !env.take_reload_request() {
        return false;
    }
    session.reload();
    true
}

/// Runs the `tabvault shell` interactive REPL.
pub async fn run_shell(config: TabVaultConfig, redactions: RedactionList) -> Result<(), VaultError> {
    let env = Arc::new(ProcessHost::new());
    let session = TabSession::open(tab_host(env.clone()), config, redactions);
    info!(session_id = %session.monitor().session_id(), "tab session opened");
    let session = Arc::new(Mutex::new(session));

    let cancel = CancellationToken::new();
    let ticker = spawn_ticker(session.clone(), TICK_PERIOD, cancel.clone());

    let mut rl = DefaultEditor::new()
        .map_err(|e| VaultError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", "tabvault shell".bold().green());
    println!("Type {} for commands, {} to exit.\n", "help".yellow(), "quit".yellow());

    let prompt = format!("{}> ", "tabvault".green());
    let mut fatal = None;
    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                let command = match trimmed.parse::<ShellCommand>() {
                    Ok(command) => command,
                    Err(message) => {
                        eprintln!("{}: {message}", "error".red());
                        continue;
                    }
                };
                if command == ShellCommand::Quit {
                    break;
                }

                let token = match &command {
                    ShellCommand::Store { .. } => match prompt::read_token("token: ") {
                        Ok(token) => Some(token),
                        Err(e) => {
                            eprintln!("{}: {e}", "error".red());
                            continue;
                        }
                    },
                    _ => None,
                };

                let mut guard = session.lock().await;
                if apply_pending_reload(&env, &mut guard) {
                    println!("{}", "tab reloaded after background invalidation".yellow());
                }
                if let Some(e) = print_outcome(execute(&mut guard, command, token).await) {
                    fatal = Some(e);
                    break;
                }
                if apply_pending_reload(&env, &mut guard) {
                    println!(
                        "{} {}",
                        "tab reloaded, new session".yellow(),
                        guard.monitor().session_id()
                    );
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C
                break;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D
                break;
            }
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    cancel.cancel();
    if let Err(e) = ticker.await {
        debug!(error = %e, "ticker task ended abnormally");
    }
    match fatal {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
