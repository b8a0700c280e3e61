// SPDX-FileCopyrightText: 2026 TabVault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the vault, the session monitor, and the UI surface.

use chrono::{DateTime, TimeDelta, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for one tab session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Severity attached to every security event.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// High and critical events are also emitted on the tracing side channel.
    pub fn is_alerting(self) -> bool {
        self >= Severity::High
    }
}

/// A decrypted third-party credential (username + API token).
///
/// The token stays wrapped in [`SecretString`]; its `Debug` output is redacted.
#[derive(Debug)]
pub struct Credential {
    pub username: String,
    pub token: SecretString,
}

impl Credential {
    pub fn new(username: impl Into<String>, token: SecretString) -> Self {
        Self {
            username: username.into(),
            token,
        }
    }
}

/// Read-only projection of the stored credential for UI display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialStatus {
    pub expires_at: DateTime<Utc>,
    pub fingerprint: String,
    pub key_version: u32,
    pub next_rotation: DateTime<Utc>,
}

/// Outer/inner window dimensions reported by the host, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowGeometry {
    pub outer_width: u32,
    pub outer_height: u32,
    pub inner_width: u32,
    pub inner_height: u32,
}

impl WindowGeometry {
    /// Largest gap between outer and inner size on either axis.
    pub fn chrome_gap(&self) -> u32 {
        let w = self.outer_width.saturating_sub(self.inner_width);
        let h = self.outer_height.saturating_sub(self.inner_height);
        w.max(h)
    }
}

/// Convert a configured number of seconds into a [`TimeDelta`], saturating.
pub fn secs(value: u64) -> TimeDelta {
    i64::try_from(value)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn severity_orders_by_urgency() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
        assert!(Severity::High.is_alerting());
        assert!(Severity::Critical.is_alerting());
        assert!(!Severity::Medium.is_alerting());
    }

    #[test]
    fn severity_display_and_parse() {
        for s in [
            Severity::Low,
            Severity::Medium,
            Severity::High,
            Severity::Critical,
        ] {
            assert_eq!(Severity::from_str(&s.to_string()).unwrap(), s);
        }
        assert_eq!(Severity::High.to_string(), "high");
        assert_eq!(serde_json::to_string(&Severity::Critical).unwrap(), "\"critical\"");
    }

    #[test]
    fn credential_debug_hides_token() {
        let cred = Credential::new("alice", SecretString::from("abc123".to_string()));
        let debug = format!("{cred:?}");
        assert!(debug.contains("alice"));
        assert!(!debug.contains("abc123"));
    }

    #[test]
    fn chrome_gap_takes_larger_axis() {
        let g = WindowGeometry {
            outer_width: 1400,
            outer_height: 900,
            inner_width: 1380,
            inner_height: 600,
        };
        assert_eq!(g.chrome_gap(), 300);
    }

    #[test]
    fn secs_saturates() {
        assert_eq!(secs(60), TimeDelta::seconds(60));
        assert_eq!(secs(u64::MAX), TimeDelta::MAX);
    }
}
