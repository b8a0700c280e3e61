// SPDX-FileCopyrightText: 2026 TabVault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key-value store trait for tab-scoped (ephemeral) and origin-scoped (persistent) storage.

use crate::error::VaultError;

/// A string key-value store with the semantics of browser web storage.
///
/// Each `set` is a single atomic write; there are no transactions.
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, VaultError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), VaultError>;

    /// Removes `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), VaultError>;

    /// Lists every key currently stored.
    fn keys(&self) -> Result<Vec<String>, VaultError>;
}
