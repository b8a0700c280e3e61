// SPDX-FileCopyrightText: 2026 TabVault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end tab session tests.
//!
//! `TestHarness` owns every seam of the session so tests can move time,
//! change the user agent, resize the window and inspect raw storage.

use std::sync::Arc;

use chrono::TimeDelta;
use secrecy::SecretString;
use tabvault_config::TabVaultConfig;
use tabvault_core::{KeyValueStore, ManualClock, StaticHost, TabHost};
use tabvault_security::RedactionList;
use tabvault_session::TabSession;
use tabvault_storage::MemoryStore;

/// Iteration count used by harness sessions. Far below the production
/// minimum; config validation is not applied here.
pub const TEST_KDF_ITERATIONS: u32 = 1_000;

/// User agent every harness host starts with.
pub const TEST_USER_AGENT: &str = "Mozilla/5.0 (TabVault test harness)";

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: TabVaultConfig,
    user_agent: String,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = TabVaultConfig::default();
        config.vault.kdf_iterations = TEST_KDF_ITERATIONS;
        Self {
            config,
            user_agent: TEST_USER_AGENT.to_string(),
        }
    }

    /// Replace the whole configuration. The KDF iteration count stays
    /// capped at [`TEST_KDF_ITERATIONS`].
    pub fn with_config(mut self, config: TabVaultConfig) -> Self {
        let iterations = config.vault.kdf_iterations.min(TEST_KDF_ITERATIONS);
        self.config = config;
        self.config.vault.kdf_iterations = iterations;
        self
    }

    pub fn with_access_ceiling(mut self, ceiling: u32) -> Self {
        self.config.session.access_ceiling = ceiling;
        self
    }

    pub fn with_access_window_secs(mut self, secs: u64) -> Self {
        self.config.session.access_window_secs = secs;
        self
    }

    pub fn with_audit_capacity(mut self, capacity: usize) -> Self {
        self.config.audit.capacity = capacity;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn build(self) -> TestHarness {
        let clock = Arc::new(ManualClock::starting_now());
        let env = Arc::new(StaticHost::new(self.user_agent));
        let ephemeral = Arc::new(MemoryStore::new());
        let persistent = Arc::new(MemoryStore::new());
        let redactions = RedactionList::new();
        let host = TabHost {
            ephemeral: ephemeral.clone(),
            persistent: persistent.clone(),
            clock: clock.clone(),
            env: env.clone(),
        };
        let session = TabSession::open(host, self.config, redactions.clone());
        TestHarness {
            session,
            clock,
            env,
            ephemeral,
            persistent,
            redactions,
        }
    }
}

/// A complete tab session plus handles on every seam it was built from.
pub struct TestHarness {
    pub session: TabSession,
    pub clock: Arc<ManualClock>,
    pub env: Arc<StaticHost>,
    pub ephemeral: Arc<MemoryStore>,
    pub persistent: Arc<MemoryStore>,
    pub redactions: RedactionList,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A harness with default settings.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn advance(&self, delta: TimeDelta) {
        self.clock.advance(delta);
    }

    pub fn token(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    /// Raw value of `{namespace}:{suffix}` in the ephemeral store.
    pub fn raw(&self, suffix: &str) -> Option<String> {
        let key = format!("{}:{suffix}", self.session.config().vault.namespace);
        self.ephemeral.get(&key).ok().flatten()
    }

    /// Ephemeral keys other than the session info.
    pub fn vault_keys(&self) -> Vec<String> {
        let session_key = format!("{}:session", self.session.config().vault.namespace);
        self.ephemeral
            .keys()
            .unwrap_or_default()
            .into_iter()
            .filter(|k| *k != session_key)
            .collect()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
