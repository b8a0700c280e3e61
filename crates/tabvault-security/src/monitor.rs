// SPDX-FileCopyrightText: 2026 TabVault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-tab session security monitor.
//!
//! The monitor owns the session identity, the credential access counter and
//! the audit log. Its state machine has two states:
//!
//! ```text
//! Active --(inactivity timeout | user-agent mismatch | explicit invalidate)--> Invalidated
//! ```
//!
//! Invalidation wipes every key the application owns in both stores, clears
//! the audit log and the redaction list, and asks the host to reload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use tabvault_config::model::{AuditConfig, SessionConfig};
use tabvault_core::{SessionId, Severity, TabHost, VaultError};
use tabvault_storage::StorageKeys;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::audit::{AuditLog, SecurityEvent, SecurityEventKind, SeverityCounts};
use crate::redact::RedactionList;

/// States of the session FSM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MonitorState {
    /// Credential operations are allowed, subject to the access ceiling.
    Active,
    /// Terminal until the host reloads and a fresh session is started.
    Invalidated,
}

/// Identity and counters of one tab session. Persisted under `{ns}:session`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: SessionId,
    pub created: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub user_agent_snapshot: String,
    pub credential_access_count: u32,
    pub access_window_started: DateTime<Utc>,
}

impl SessionInfo {
    fn fresh(now: DateTime<Utc>, user_agent: String) -> Self {
        Self {
            id: SessionId(Uuid::new_v4().to_string()),
            created: now,
            last_activity: now,
            user_agent_snapshot: user_agent,
            credential_access_count: 0,
            access_window_started: now,
        }
    }
}

/// Aggregates shown next to the recent events in a [`SecurityReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub state: MonitorState,
    pub events_retained: usize,
    pub events_total: u64,
    pub events_evicted: u64,
    pub severity: SeverityCounts,
    pub access_count: u32,
    pub access_ceiling: u32,
    pub access_remaining: u32,
    pub session_age_secs: i64,
    pub idle_secs: i64,
    pub devtools_suspected: bool,
}

/// Read-only snapshot for a monitoring display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityReport {
    pub session_info: SessionInfo,
    pub recent_events: Vec<SecurityEvent>,
    pub summary: ReportSummary,
}

/// Watchdog for one tab session.
pub struct SessionMonitor {
    host: TabHost,
    keys: StorageKeys,
    config: SessionConfig,
    report_limit: usize,
    audit: AuditLog,
    redactions: RedactionList,
    info: SessionInfo,
    state: MonitorState,
    devtools_open: bool,
}

impl std::fmt::Debug for SessionMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionMonitor")
            .field("session_id", &self.info.id)
            .field("state", &self.state)
            .field("access_count", &self.info.credential_access_count)
            .field("events", &self.audit.len())
            .finish_non_exhaustive()
    }
}

impl SessionMonitor {
    /// Start monitoring, resuming the session persisted in the ephemeral
    /// store if there is a readable one.
    pub fn start(
        host: TabHost,
        keys: StorageKeys,
        config: SessionConfig,
        audit: &AuditConfig,
        redactions: RedactionList,
    ) -> Self {
        let now = host.clock.now();
        let user_agent = host.env.user_agent();
        let loaded = load_session(&host, &keys);

        let mut monitor = Self {
            info: SessionInfo::fresh(now, user_agent),
            host,
            keys,
            config,
            report_limit: audit.report_limit,
            audit: AuditLog::new(audit.capacity),
            redactions,
            state: MonitorState::Active,
            devtools_open: false,
        };

        match loaded {
            Ok(Some(info)) => {
                monitor.info = info;
                monitor.log_security_event(
                    SecurityEventKind::SessionStarted,
                    "session resumed",
                    Severity::Low,
                );
            }
            Ok(None) => {
                monitor.persist();
                monitor.log_security_event(
                    SecurityEventKind::SessionStarted,
                    "session started",
                    Severity::Low,
                );
            }
            Err(reason) => {
                monitor.persist();
                monitor.log_security_event(
                    SecurityEventKind::RecordMalformed,
                    format!("stored session discarded: {reason}"),
                    Severity::Medium,
                );
            }
        }

        info!(session_id = %monitor.info.id, "session monitor started");
        monitor
    }

    pub fn session_id(&self) -> &SessionId {
        &self.info.id
    }

    pub fn session_info(&self) -> &SessionInfo {
        &self.info
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == MonitorState::Active
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn redactions(&self) -> &RedactionList {
        &self.redactions
    }

    /// Append an event to the audit log. Never fails.
    ///
    /// Details are redacted before they are stored. High and critical
    /// events are also emitted on the tracing side channel.
    pub fn log_security_event(
        &mut self,
        kind: SecurityEventKind,
        details: impl Into<String>,
        severity: Severity,
    ) {
        let details = self.redactions.apply(&details.into());
        if severity == Severity::Critical {
            error!(session_id = %self.info.id, kind = %kind, %details, "security event");
        } else if severity.is_alerting() {
            warn!(session_id = %self.info.id, kind = %kind, %details, "security event");
        } else {
            debug!(session_id = %self.info.id, kind = %kind, severity = %severity, %details, "security event");
        }
        self.audit.push(SecurityEvent {
            timestamp: self.host.clock.now(),
            kind,
            details,
            severity,
            session_id: self.info.id.clone(),
        });
    }

    /// Count one credential access against the ceiling.
    ///
    /// Returns `false` (and logs a high event) once the ceiling is reached;
    /// a denied access does not increment the counter. With an access window
    /// configured the counter restarts when the window elapses, otherwise it
    /// only restarts with a new session.
    pub fn log_credential_access(&mut self, operation: &str) -> bool {
        let now = self.host.clock.now();
        if let Some(window) = self.config.access_window()
            && now - self.info.access_window_started >= window
        {
            debug!(
                previous = self.info.credential_access_count,
                "access window elapsed, counter restarted"
            );
            self.info.credential_access_count = 0;
            self.info.access_window_started = now;
        }

        let ceiling = self.config.access_ceiling;
        if self.info.credential_access_count >= ceiling {
            self.log_security_event(
                SecurityEventKind::AccessDenied,
                format!("{operation} denied: access ceiling of {ceiling} reached"),
                Severity::High,
            );
            return false;
        }

        self.info.credential_access_count += 1;
        let count = self.info.credential_access_count;
        self.log_security_event(
            SecurityEventKind::CredentialAccess,
            format!("{operation} ({count}/{ceiling})"),
            Severity::Low,
        );
        self.persist();
        true
    }

    /// Gate a credential operation: the session must be active and valid
    /// and the access ceiling not reached.
    pub fn authorize(&mut self, operation: &str) -> Result<(), VaultError> {
        if !self.is_active() {
            self.log_security_event(
                SecurityEventKind::AccessDenied,
                format!("{operation} denied: session invalidated"),
                Severity::High,
            );
            return Err(VaultError::access_denied("session invalidated"));
        }
        if !self.validate_session() {
            return Err(VaultError::access_denied("session is no longer valid"));
        }
        if !self.log_credential_access(operation) {
            return Err(VaultError::access_denied("credential access ceiling reached"));
        }
        self.record_activity();
        Ok(())
    }

    /// Check the inactivity timeout and the user-agent snapshot.
    ///
    /// A failed check invalidates the session.
    pub fn validate_session(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }

        let now = self.host.clock.now();
        let idle = now - self.info.last_activity;
        if idle > self.config.timeout() {
            self.invalidate(&format!(
                "inactive for {}s (timeout {}s)",
                idle.num_seconds(),
                self.config.timeout_secs
            ));
            return false;
        }

        if self.host.env.user_agent() != self.info.user_agent_snapshot {
            self.invalidate("user agent no longer matches the session snapshot");
            return false;
        }

        true
    }

    /// Tear the session down. Idempotent.
    pub fn invalidate(&mut self, reason: &str) {
        if !self.is_active() {
            return;
        }

        self.log_security_event(
            SecurityEventKind::SessionInvalidated,
            format!("session invalidated: {reason}"),
            Severity::High,
        );

        for (name, store) in [
            ("ephemeral", &self.host.ephemeral),
            ("persistent", &self.host.persistent),
        ] {
            if let Err(e) = self.keys.purge(store.as_ref()) {
                warn!(store = name, error = %e, "failed to purge store during invalidation");
            }
        }

        // The SessionInvalidated event above survives only on the tracing
        // channel; the audit log belongs to the session being torn down.
        self.audit.clear();
        self.redactions.clear();
        self.state = MonitorState::Invalidated;
        self.devtools_open = false;
        self.host.env.reload();
    }

    /// Begin a fresh session (after a reload, or an explicit logout).
    pub fn reset(&mut self) {
        let previous = self.info.id.clone();
        self.info = SessionInfo::fresh(self.host.clock.now(), self.host.env.user_agent());
        self.state = MonitorState::Active;
        self.devtools_open = false;
        self.persist();
        self.log_security_event(
            SecurityEventKind::SessionReset,
            format!("new session replaces {previous}"),
            Severity::Low,
        );
    }

    pub fn record_activity(&mut self) {
        self.info.last_activity = self.host.clock.now();
        self.persist();
    }

    /// Developer-tools heuristic. Advisory only: logs a medium event when the
    /// window chrome gap first exceeds the threshold, and again only after it
    /// has closed and reopened.
    pub fn check_devtools(&mut self) -> bool {
        let Some(geometry) = self.host.env.window_geometry() else {
            return false;
        };
        let gap = geometry.chrome_gap();
        let threshold = self.config.devtools_threshold_px;
        let suspected = gap > threshold;
        if suspected && !self.devtools_open {
            self.log_security_event(
                SecurityEventKind::DevtoolsSuspected,
                format!("window chrome gap of {gap}px exceeds {threshold}px"),
                Severity::Medium,
            );
        }
        self.devtools_open = suspected;
        suspected
    }

    pub fn report(&self) -> SecurityReport {
        let now = self.host.clock.now();
        let ceiling = self.config.access_ceiling;
        let count = self.info.credential_access_count;
        SecurityReport {
            session_info: self.info.clone(),
            recent_events: self.audit.recent(self.report_limit),
            summary: ReportSummary {
                state: self.state,
                events_retained: self.audit.len(),
                events_total: self.audit.total_logged(),
                events_evicted: self.audit.evicted(),
                severity: self.audit.severity_counts(),
                access_count: count,
                access_ceiling: ceiling,
                access_remaining: ceiling.saturating_sub(count),
                session_age_secs: (now - self.info.created).num_seconds(),
                idle_secs: (now - self.info.last_activity).num_seconds(),
                devtools_suspected: self.devtools_open,
            },
        }
    }

    /// Best effort: a failed write is logged and otherwise ignored.
    fn persist(&self) {
        if !self.is_active() {
            return;
        }
        let result = serde_json::to_string(&self.info)
            .map_err(|e| VaultError::Internal(e.to_string()))
            .and_then(|json| self.host.ephemeral.set(&self.keys.session(), &json));
        if let Err(e) = result {
            debug!(error = %e, "failed to persist session info");
        }
    }
}

fn load_session(host: &TabHost, keys: &StorageKeys) -> Result<Option<SessionInfo>, String> {
    let raw = host
        .ephemeral
        .get(&keys.session())
        .map_err(|e| e.to_string())?;
    match raw {
        Some(json) => serde_json::from_str(&json)
            .map(Some)
            .map_err(|_| "unreadable session info".to_string()),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeDelta;
    use tabvault_core::{Clock, KeyValueStore, ManualClock, StaticHost, WindowGeometry};
    use tabvault_storage::MemoryStore;
    use tracing_test::traced_test;

    use super::*;

    const UA: &str = "Mozilla/5.0 (X11; Linux x86_64) Firefox/131.0";

    struct Fixture {
        clock: Arc<ManualClock>,
        env: Arc<StaticHost>,
        ephemeral: Arc<MemoryStore>,
        persistent: Arc<MemoryStore>,
        host: TabHost,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::starting_now());
        let env = Arc::new(StaticHost::new(UA));
        let ephemeral = Arc::new(MemoryStore::new());
        let persistent = Arc::new(MemoryStore::new());
        let host = TabHost {
            ephemeral: ephemeral.clone(),
            persistent: persistent.clone(),
            clock: clock.clone(),
            env: env.clone(),
        };
        Fixture {
            clock,
            env,
            ephemeral,
            persistent,
            host,
        }
    }

    fn monitor_with(f: &Fixture, config: SessionConfig, audit: AuditConfig) -> SessionMonitor {
        SessionMonitor::start(
            f.host.clone(),
            StorageKeys::new("tabvault"),
            config,
            &audit,
            RedactionList::new(),
        )
    }

    fn monitor(f: &Fixture) -> SessionMonitor {
        monitor_with(f, SessionConfig::default(), AuditConfig::default())
    }

    #[test]
    fn start_persists_new_session() {
        let f = fixture();
        let m = monitor(&f);
        let raw = f.ephemeral.get("tabvault:session").unwrap().unwrap();
        let stored: SessionInfo = serde_json::from_str(&raw).unwrap();
        assert_eq!(&stored.id, m.session_id());
        assert_eq!(stored.user_agent_snapshot, UA);
        assert_eq!(m.audit().last().unwrap().kind, SecurityEventKind::SessionStarted);
    }

    #[test]
    fn start_resumes_existing_session() {
        let f = fixture();
        let first = monitor(&f);
        let id = first.session_id().clone();
        drop(first);
        let second = monitor(&f);
        assert_eq!(second.session_id(), &id);
    }

    #[test]
    fn start_replaces_malformed_session() {
        let f = fixture();
        f.ephemeral.set("tabvault:session", "{\"id\":42}").unwrap();
        let m = monitor(&f);
        assert_eq!(m.audit().last().unwrap().kind, SecurityEventKind::RecordMalformed);
        let raw = f.ephemeral.get("tabvault:session").unwrap().unwrap();
        assert!(serde_json::from_str::<SessionInfo>(&raw).is_ok());
    }

    #[test]
    fn access_ceiling_denies_the_next_call() {
        let f = fixture();
        let config = SessionConfig {
            access_ceiling: 5,
            ..SessionConfig::default()
        };
        let mut m = monitor_with(&f, config, AuditConfig::default());

        for _ in 0..5 {
            assert!(m.log_credential_access("retrieve"));
        }
        assert!(!m.log_credential_access("retrieve"));

        let last = m.audit().last().unwrap();
        assert_eq!(last.kind, SecurityEventKind::AccessDenied);
        assert_eq!(last.severity, Severity::High);
        assert_eq!(m.session_info().credential_access_count, 5);
    }

    #[test]
    fn default_ceiling_has_no_time_reset() {
        let f = fixture();
        let config = SessionConfig {
            access_ceiling: 2,
            ..SessionConfig::default()
        };
        let mut m = monitor_with(&f, config, AuditConfig::default());
        assert!(m.log_credential_access("store"));
        assert!(m.log_credential_access("retrieve"));
        f.clock.advance(TimeDelta::hours(7));
        assert!(!m.log_credential_access("retrieve"));
    }

    #[test]
    fn access_window_restarts_counter() {
        let f = fixture();
        let config = SessionConfig {
            access_ceiling: 2,
            access_window_secs: 600,
            ..SessionConfig::default()
        };
        let mut m = monitor_with(&f, config, AuditConfig::default());
        assert!(m.log_credential_access("retrieve"));
        assert!(m.log_credential_access("retrieve"));
        assert!(!m.log_credential_access("retrieve"));

        f.clock.advance(TimeDelta::seconds(600));
        assert!(m.log_credential_access("retrieve"));
        assert_eq!(m.session_info().credential_access_count, 1);
    }

    #[test]
    fn reset_restores_access() {
        let f = fixture();
        let config = SessionConfig {
            access_ceiling: 1,
            ..SessionConfig::default()
        };
        let mut m = monitor_with(&f, config, AuditConfig::default());
        let old = m.session_id().clone();
        assert!(m.log_credential_access("retrieve"));
        assert!(!m.log_credential_access("retrieve"));

        m.reset();
        assert_ne!(m.session_id(), &old);
        assert!(m.log_credential_access("retrieve"));
    }

    #[test]
    fn inactivity_timeout_invalidates() {
        let f = fixture();
        let mut m = monitor(&f);
        f.clock.advance(TimeDelta::hours(8) + TimeDelta::seconds(1));
        assert!(!m.validate_session());
        assert_eq!(m.state(), MonitorState::Invalidated);
        assert_eq!(f.env.reload_count(), 1);
    }

    #[test]
    fn activity_keeps_session_alive() {
        let f = fixture();
        let mut m = monitor(&f);
        f.clock.advance(TimeDelta::hours(6));
        m.record_activity();
        f.clock.advance(TimeDelta::hours(6));
        assert!(m.validate_session());
    }

    #[test]
    #[traced_test]
    fn user_agent_change_wipes_owned_storage_and_reloads() {
        let f = fixture();
        let mut m = monitor(&f);
        m.redactions().add("abc123");
        f.ephemeral.set("tabvault:record", "{}").unwrap();
        f.ephemeral.set("tabvault:secret_v1", "c2VjcmV0").unwrap();
        f.persistent.set("tabvault:prefs", "{}").unwrap();
        f.persistent.set("other-app:prefs", "{}").unwrap();

        f.env.set_user_agent("curl/8.0");
        assert!(!m.validate_session());

        assert!(f.ephemeral.is_empty());
        assert_eq!(f.persistent.keys().unwrap(), vec!["other-app:prefs".to_string()]);
        assert!(m.audit().is_empty());
        assert!(m.redactions().is_empty());
        assert_eq!(f.env.reload_count(), 1);
        assert!(logs_contain("session invalidated"));
        assert!(logs_contain("session_invalidated"));
    }

    #[test]
    fn invalidate_is_idempotent() {
        let f = fixture();
        let mut m = monitor(&f);
        m.invalidate("logout");
        m.invalidate("logout");
        assert_eq!(f.env.reload_count(), 1);
        assert!(!m.validate_session());
    }

    #[test]
    fn authorize_rejects_invalidated_session() {
        let f = fixture();
        let mut m = monitor(&f);
        m.invalidate("logout");
        let err = m.authorize("retrieve").unwrap_err();
        assert!(matches!(err, VaultError::AccessDenied { .. }));
        assert_eq!(m.audit().last().unwrap().kind, SecurityEventKind::AccessDenied);
    }

    #[test]
    fn authorize_counts_and_touches_activity() {
        let f = fixture();
        let mut m = monitor(&f);
        f.clock.advance(TimeDelta::minutes(5));
        m.authorize("store").unwrap();
        assert_eq!(m.session_info().credential_access_count, 1);
        assert_eq!(m.session_info().last_activity, f.clock.now());
    }

    #[test]
    fn devtools_logged_once_per_opening() {
        let f = fixture();
        let mut m = monitor(&f);
        let closed = WindowGeometry {
            outer_width: 1400,
            outer_height: 900,
            inner_width: 1400,
            inner_height: 820,
        };
        let open = WindowGeometry {
            inner_height: 500,
            ..closed
        };
        let count = |m: &SessionMonitor| {
            m.audit()
                .iter()
                .filter(|e| e.kind == SecurityEventKind::DevtoolsSuspected)
                .count()
        };

        f.env.set_geometry(Some(closed));
        assert!(!m.check_devtools());
        f.env.set_geometry(Some(open));
        assert!(m.check_devtools());
        assert!(m.check_devtools());
        assert_eq!(count(&m), 1);

        f.env.set_geometry(Some(closed));
        assert!(!m.check_devtools());
        f.env.set_geometry(Some(open));
        assert!(m.check_devtools());
        assert_eq!(count(&m), 2);
        assert_eq!(m.audit().last().unwrap().severity, Severity::Medium);
        assert!(m.is_active());
    }

    #[test]
    fn event_details_are_redacted() {
        let f = fixture();
        let mut m = monitor(&f);
        m.redactions().add("abc123");
        m.log_security_event(
            SecurityEventKind::CredentialRetrieved,
            "echoed abc123",
            Severity::Low,
        );
        assert_eq!(m.audit().last().unwrap().details, "echoed [REDACTED]");
    }

    #[test]
    fn report_is_bounded_and_summarised() {
        let f = fixture();
        let config = SessionConfig {
            access_ceiling: 30,
            ..SessionConfig::default()
        };
        let audit = AuditConfig {
            capacity: 10,
            report_limit: 4,
        };
        let mut m = monitor_with(&f, config, audit);
        for _ in 0..12 {
            assert!(m.log_credential_access("retrieve"));
        }
        f.clock.advance(TimeDelta::seconds(90));

        let report = m.report();
        assert_eq!(report.recent_events.len(), 4);
        assert_eq!(report.recent_events[3].details, "retrieve (12/30)");
        assert_eq!(report.summary.events_retained, 10);
        assert_eq!(report.summary.events_total, 13);
        assert_eq!(report.summary.events_evicted, 3);
        assert_eq!(report.summary.access_remaining, 18);
        assert_eq!(report.summary.idle_secs, 90);
        assert_eq!(report.summary.state, MonitorState::Active);
    }
}
