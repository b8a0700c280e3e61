// SPDX-FileCopyrightText: 2026 TabVault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-tab context object: one vault, one monitor, one scheduler.
//!
//! [`TabSession`] is the whole function surface the UI talks to. It is
//! constructed explicitly when the tab opens and rebuilt by [`TabSession::reload`]
//! after the monitor has invalidated the session.

use secrecy::SecretString;
use tabvault_config::TabVaultConfig;
use tabvault_core::{Credential, CredentialStatus, TabHost, VaultError};
use tabvault_security::{MonitorState, RedactionList, SecurityReport, SessionMonitor};
use tabvault_storage::StorageKeys;
use tabvault_vault::CredentialVault;
use tracing::{debug, info, warn};

use crate::scheduler::{PeriodicTask, Scheduler};

/// Outcome of one [`TabSession::tick`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tasks that were due and ran.
    pub ran: Vec<PeriodicTask>,
    /// New key version, if the rotation check rotated.
    pub rotated_to: Option<u32>,
    /// Result of the session validation, if it ran.
    pub session_valid: Option<bool>,
    /// Result of the developer-tools probe, if it ran.
    pub devtools_suspected: Option<bool>,
}

/// One tab's vault session.
pub struct TabSession {
    host: TabHost,
    config: TabVaultConfig,
    redactions: RedactionList,
    vault: CredentialVault,
    monitor: SessionMonitor,
    scheduler: Scheduler,
}

impl std::fmt::Debug for TabSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TabSession")
            .field("monitor", &self.monitor)
            .field("vault", &self.vault)
            .finish_non_exhaustive()
    }
}

impl TabSession {
    /// Open the session for a tab. Resumes a session persisted in the
    /// ephemeral store, if any.
    pub fn open(host: TabHost, config: TabVaultConfig, redactions: RedactionList) -> Self {
        let vault = CredentialVault::new(host.clone(), &config.vault);
        let monitor = SessionMonitor::start(
            host.clone(),
            StorageKeys::new(config.vault.namespace.clone()),
            config.session.clone(),
            &config.audit,
            redactions.clone(),
        );
        let scheduler = Scheduler::new(host.clock.now(), &config);
        debug!(
            tasks = ?scheduler.tasks().collect::<Vec<_>>(),
            next_due = ?scheduler.next_due(),
            "background checks scheduled"
        );
        Self {
            host,
            config,
            redactions,
            vault,
            monitor,
            scheduler,
        }
    }

    pub fn config(&self) -> &TabVaultConfig {
        &self.config
    }

    pub fn monitor(&self) -> &SessionMonitor {
        &self.monitor
    }

    pub fn vault(&self) -> &CredentialVault {
        &self.vault
    }

    pub fn state(&self) -> MonitorState {
        self.monitor.state()
    }

    pub async fn store(&mut self, username: &str, token: SecretString) -> Result<(), VaultError> {
        let credential = Credential::new(username, token);
        self.vault.store(&mut self.monitor, &credential).await
    }

    pub async fn retrieve(&mut self) -> Result<Option<Credential>, VaultError> {
        self.vault.retrieve(&mut self.monitor).await
    }

    pub fn clear(&mut self) -> Result<(), VaultError> {
        self.vault.clear(&mut self.monitor)
    }

    pub fn status(&mut self) -> Result<Option<CredentialStatus>, VaultError> {
        self.vault.status(&mut self.monitor)
    }

    pub fn security_report(&self) -> SecurityReport {
        self.monitor.report()
    }

    /// Explicit logout: wipe everything and request a reload.
    pub fn invalidate(&mut self, reason: &str) {
        self.monitor.invalidate(reason);
    }

    /// Rebuild all in-memory state, as a page reload would.
    pub fn reload(&mut self) {
        info!("reloading tab session");
        self.redactions.clear();
        *self = Self::open(self.host.clone(), self.config.clone(), self.redactions.clone());
    }

    /// Run every periodic task that is due by the session clock.
    ///
    /// Failures are logged and never stop the remaining tasks. Nothing runs
    /// once the session is invalidated.
    pub async fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();
        if !self.monitor.is_active() {
            return report;
        }

        for task in self.scheduler.due(self.host.clock.now()) {
            if !self.monitor.is_active() {
                break;
            }
            report.ran.push(task);
            match task {
                PeriodicTask::RotationCheck => {
                    match self.vault.rotate_if_due(&mut self.monitor).await {
                        Ok(version) => report.rotated_to = version,
                        Err(e) => warn!(error = %e, "background rotation check failed"),
                    }
                }
                PeriodicTask::SessionValidation => {
                    report.session_valid = Some(self.monitor.validate_session());
                }
                PeriodicTask::DevtoolsProbe => {
                    report.devtools_suspected = Some(self.monitor.check_devtools());
                }
            }
        }

        if !report.ran.is_empty() {
            debug!(
                tasks = ?report.ran,
                next_due = ?self.scheduler.next_due(),
                "periodic tasks ran"
            );
        }
        report
    }
}
