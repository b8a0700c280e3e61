// SPDX-FileCopyrightText: 2026 TabVault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The bundle of host seams one tab session is built from.

use std::sync::Arc;

use crate::traits::{Clock, HostEnvironment, KeyValueStore};

/// Everything a tab provides to the vault and the monitor.
///
/// `ephemeral` is tab-scoped storage (cleared when the tab closes);
/// `persistent` is origin-scoped storage the application also owns and
/// wipes on invalidation.
#[derive(Clone)]
pub struct TabHost {
    pub ephemeral: Arc<dyn KeyValueStore>,
    pub persistent: Arc<dyn KeyValueStore>,
    pub clock: Arc<dyn Clock>,
    pub env: Arc<dyn HostEnvironment>,
}

impl std::fmt::Debug for TabHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TabHost")
            .field("user_agent", &self.env.user_agent())
            .field("now", &self.clock.now())
            .finish_non_exhaustive()
    }
}
