// SPDX-FileCopyrightText: 2026 TabVault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The page host: identity signals the monitor watches, and the reload hook.

use std::sync::RwLock;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::types::WindowGeometry;

/// Environment the vault runs in (a browser tab, or a simulation of one).
pub trait HostEnvironment: Send + Sync {
    /// Current user-agent / browser fingerprint string.
    fn user_agent(&self) -> String;

    /// Current window geometry, if the host can report it.
    fn window_geometry(&self) -> Option<WindowGeometry>;

    /// Force a full page reload, discarding all in-memory state.
    fn reload(&self);
}

/// A host whose signals are set explicitly. Counts reload requests.
#[derive(Debug)]
pub struct StaticHost {
    user_agent: RwLock<String>,
    geometry: RwLock<Option<WindowGeometry>>,
    reloads: AtomicU32,
}

impl StaticHost {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: RwLock::new(user_agent.into()),
            geometry: RwLock::new(None),
            reloads: AtomicU32::new(0),
        }
    }

    pub fn set_user_agent(&self, user_agent: impl Into<String>) {
        if let Ok(mut ua) = self.user_agent.write() {
            *ua = user_agent.into();
        }
    }

    pub fn set_geometry(&self, geometry: Option<WindowGeometry>) {
        if let Ok(mut g) = self.geometry.write() {
            *g = geometry;
        }
    }

    /// Number of times [`HostEnvironment::reload`] was requested.
    pub fn reload_count(&self) -> u32 {
        self.reloads.load(Ordering::SeqCst)
    }
}

impl HostEnvironment for StaticHost {
    fn user_agent(&self) -> String {
        self.user_agent
            .read()
            .map(|ua| ua.clone())
            .unwrap_or_default()
    }

    fn window_geometry(&self) -> Option<WindowGeometry> {
        self.geometry.read().ok().and_then(|g| *g)
    }

    fn reload(&self) {
        self.reloads.fetch_add(1, Ordering::SeqCst);
    }
}
