// SPDX-FileCopyrightText: 2026 TabVault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the TabVault credential vault.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use tabvault_core::secs;

/// Top-level TabVault configuration.
///
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TabVaultConfig {
    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Encryption, expiry and key rotation settings.
    #[serde(default)]
    pub vault: VaultConfig,

    /// Session security monitor settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Audit log settings.
    #[serde(default)]
    pub audit: AuditConfig,
}

/// Log output configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Credential vault configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VaultConfig {
    /// Prefix for every storage key the vault owns.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// PBKDF2-HMAC-SHA256 iteration count (default: 100000).
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// Absolute age limit of a stored credential in seconds (default: 24h).
    #[serde(default = "default_credential_expiry_secs")]
    pub credential_expiry_secs: u64,

    /// Seconds between key rotations (default: 1h).
    #[serde(default = "default_rotation_interval_secs")]
    pub rotation_interval_secs: u64,

    /// How often the background task checks whether a rotation is due.
    #[serde(default = "default_rotation_check_interval_secs")]
    pub rotation_check_interval_secs: u64,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            kdf_iterations: default_kdf_iterations(),
            credential_expiry_secs: default_credential_expiry_secs(),
            rotation_interval_secs: default_rotation_interval_secs(),
            rotation_check_interval_secs: default_rotation_check_interval_secs(),
        }
    }
}

impl VaultConfig {
    pub fn credential_expiry(&self) -> TimeDelta {
        secs(self.credential_expiry_secs)
    }

    pub fn rotation_interval(&self) -> TimeDelta {
        secs(self.rotation_interval_secs)
    }
}

fn default_namespace() -> String {
    "tabvault".to_string()
}

fn default_kdf_iterations() -> u32 {
    100_000
}

fn default_credential_expiry_secs() -> u64 {
    24 * 60 * 60
}

fn default_rotation_interval_secs() -> u64 {
    60 * 60
}

fn default_rotation_check_interval_secs() -> u64 {
    60
}

/// Session security monitor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Inactivity timeout in seconds (default: 8h).
    #[serde(default = "default_session_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum credential accesses per session (or per window, see below).
    #[serde(default = "default_access_ceiling")]
    pub access_ceiling: u32,

    /// Length of the access-count window in seconds. `0` keeps a single
    /// ceiling for the whole session lifetime.
    #[serde(default)]
    pub access_window_secs: u64,

    /// How often the background task re-validates the session.
    #[serde(default = "default_validation_interval_secs")]
    pub validation_interval_secs: u64,

    /// How often the developer-tools heuristic polls window geometry.
    #[serde(default = "default_devtools_poll_secs")]
    pub devtools_poll_secs: u64,

    /// Outer/inner window size gap (px) above which developer tools are
    /// assumed to be docked open.
    #[serde(default = "default_devtools_threshold_px")]
    pub devtools_threshold_px: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_session_timeout_secs(),
            access_ceiling: default_access_ceiling(),
            access_window_secs: 0,
            validation_interval_secs: default_validation_interval_secs(),
            devtools_poll_secs: default_devtools_poll_secs(),
            devtools_threshold_px: default_devtools_threshold_px(),
        }
    }
}

impl SessionConfig {
    pub fn timeout(&self) -> TimeDelta {
        secs(self.timeout_secs)
    }

    /// `None` when the ceiling applies to the whole session lifetime.
    pub fn access_window(&self) -> Option<TimeDelta> {
        (self.access_window_secs > 0).then(|| secs(self.access_window_secs))
    }
}

fn default_session_timeout_secs() -> u64 {
    8 * 60 * 60
}

fn default_access_ceiling() -> u32 {
    50
}

fn default_validation_interval_secs() -> u64 {
    60
}

fn default_devtools_poll_secs() -> u64 {
    5
}

fn default_devtools_threshold_px() -> u32 {
    160
}

/// Audit log configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Number of most-recent events retained in the ring buffer.
    #[serde(default = "default_audit_capacity")]
    pub capacity: usize,

    /// Number of events included in a security report.
    #[serde(default = "default_report_limit")]
    pub report_limit: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            capacity: default_audit_capacity(),
            report_limit: default_report_limit(),
        }
    }
}

fn default_audit_capacity() -> usize {
    100
}

fn default_report_limit() -> usize {
    20
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = TabVaultConfig::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.vault.namespace, "tabvault");
        assert_eq!(config.vault.kdf_iterations, 100_000);
        assert_eq!(config.vault.credential_expiry(), TimeDelta::hours(24));
        assert_eq!(config.vault.rotation_interval(), TimeDelta::hours(1));
        assert_eq!(config.session.timeout(), TimeDelta::hours(8));
        assert_eq!(config.session.access_ceiling, 50);
        assert!(config.session.access_window().is_none());
        assert_eq!(config.audit.capacity, 100);
        assert_eq!(config.audit.report_limit, 20);
    }

    #[test]
    fn access_window_enabled_when_nonzero() {
        let session = SessionConfig {
            access_window_secs: 600,
            ..SessionConfig::default()
        };
        assert_eq!(session.access_window(), Some(TimeDelta::minutes(10)));
    }

    #[test]
    fn unknown_vault_key_is_rejected() {
        let result = toml::from_str::<TabVaultConfig>("[vault]\nkdf_iteratons = 5\n");
        assert!(result.is_err());
    }
}
