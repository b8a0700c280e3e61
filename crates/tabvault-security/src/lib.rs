// SPDX-FileCopyrightText: 2026 TabVault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session security for the TabVault credential vault.
//!
//! Provides:
//! - **Session monitor**: session identity, inactivity timeout, user-agent
//!   binding, credential access ceiling, developer-tools heuristic.
//! - **Audit log**: bounded ring buffer of security events.
//! - **Redaction**: masks secrets in audit details and log output.

pub mod audit;
pub mod monitor;
pub mod redact;

pub use audit::{AuditLog, SecurityEvent, SecurityEventKind, SeverityCounts};
pub use monitor::{MonitorState, ReportSummary, SecurityReport, SessionInfo, SessionMonitor};
pub use redact::{REDACTED, RedactingWriter, RedactionList, redact};
