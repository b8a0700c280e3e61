// SPDX-FileCopyrightText: 2026 TabVault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The shell process standing in for a browser tab.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tabvault_core::{HostEnvironment, SystemClock, TabHost, WindowGeometry};
use tabvault_storage::MemoryStore;
use tracing::info;

/// Identity of this process, used as the session's user-agent snapshot.
pub fn process_user_agent() -> String {
    format!(
        "tabvault/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

/// Host environment for the interactive shell.
///
/// There is no window to measure, so the devtools probe never fires. A
/// reload request is latched and picked up by the shell loop.
#[derive(Debug)]
pub struct ProcessHost {
    user_agent: String,
    reload_requested: AtomicBool,
}

impl ProcessHost {
    pub fn new() -> Self {
        Self {
            user_agent: process_user_agent(),
            reload_requested: AtomicBool::new(false),
        }
    }

    /// Returns true once per reload request.
    pub fn take_reload_request(&self) -> bool {
        self.reload_requested.swap(false, Ordering::SeqCst)
    }
}

impl Default for ProcessHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostEnvironment for ProcessHost {
    fn user_agent(&self) -> String {
        self.user_agent.clone()
    }

    fn window_geometry(&self) -> Option<WindowGeometry> {
        None
    }

    fn reload(&self) {
        info!("tab reload requested");
        self.reload_requested.store(true, Ordering::SeqCst);
    }
}

/// Per-store quota, matching the usual browser allowance for web storage.
pub const STORE_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// Build the tab host: both stores live in memory for the life of the process.
pub fn tab_host(env: Arc<ProcessHost>) -> TabHost {
    TabHost {
        ephemeral: Arc::new(MemoryStore::with_quota(STORE_QUOTA_BYTES)),
        persistent: Arc::new(MemoryStore::with_quota(STORE_QUOTA_BYTES)),
        clock: Arc::new(SystemClock),
        env,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_names_the_binary() {
        let host = ProcessHost::new();
        assert!(host.user_agent().starts_with("tabvault/"));
        assert_eq!(host.user_agent(), host.user_agent());
        assert!(host.window_geometry().is_none());
    }

    #[test]
    fn tab_stores_enforce_quota() {
        let host = tab_host(Arc::new(ProcessHost::new()));
        let oversized = "x".repeat(STORE_QUOTA_BYTES);
        let err = host.ephemeral.set("k", &oversized).unwrap_err();
        assert!(matches!(err, tabvault_core::VaultError::Storage(_)));
        assert!(host.persistent.set("k", "v").is_ok());
    }

    #[test]
    fn reload_request_is_taken_once() {
        let host = ProcessHost::new();
        assert!(!host.take_reload_request());
        host.reload();
        assert!(host.take_reload_request());
        assert!(!host.take_reload_request());
    }
}
