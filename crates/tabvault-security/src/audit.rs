// SPDX-FileCopyrightText: 2026 TabVault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only, bounded audit log of security events.
//!
//! The most recent `capacity` events are retained; the oldest is evicted
//! when a new one arrives at capacity.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use tabvault_core::{SessionId, Severity};

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SecurityEventKind {
    SessionStarted,
    SessionReset,
    SessionInvalidated,
    CredentialAccess,
    AccessDenied,
    CredentialStored,
    CredentialRetrieved,
    CredentialCleared,
    CredentialExpired,
    DecryptionFailed,
    RecordMalformed,
    KeyRotated,
    ReencryptionFailed,
    IntegrityFailure,
    DevtoolsSuspected,
}

/// One audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: SecurityEventKind,
    pub details: String,
    pub severity: Severity,
    pub session_id: SessionId,
}

/// Number of retained events per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub critical: usize,
}

/// Ring buffer of [`SecurityEvent`]s.
#[derive(Debug)]
pub struct AuditLog {
    events: VecDeque<SecurityEvent>,
    capacity: usize,
    total_logged: u64,
    evicted: u64,
}

impl AuditLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            total_logged: 0,
            evicted: 0,
        }
    }

    /// Append an event, evicting the oldest one at capacity.
    pub fn push(&mut self, event: SecurityEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
            self.evicted += 1;
        }
        self.events.push_back(event);
        self.total_logged += 1;
    }

    /// The `limit` most recent events, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<SecurityEvent> {
        let skip = self.events.len().saturating_sub(limit);
        self.iter().skip(skip).cloned().collect()
    }

    /// Retained events, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &SecurityEvent> {
        self.events.iter()
    }

    pub fn last(&self) -> Option<&SecurityEvent> {
        self.events.back()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events ever appended, including evicted ones.
    pub fn total_logged(&self) -> u64 {
        self.total_logged
    }

    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn severity_counts(&self) -> SeverityCounts {
        self.iter()
            .fold(SeverityCounts::default(), |mut acc, e| {
                match e.severity {
                    Severity::Low => acc.low += 1,
                    Severity::Medium => acc.medium += 1,
                    Severity::High => acc.high += 1,
                    Severity::Critical => acc.critical += 1,
                }
                acc
            })
    }

    /// Wipe every retained event and reset the counters.
    pub fn clear(&mut self) {
        self.events.clear();
        self.total_logged = 0;
        self.evicted = 0;
    }
}
