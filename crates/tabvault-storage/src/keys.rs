// SPDX-FileCopyrightText: 2026 TabVault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Namespaced key layout.
//!
//! ```text
//! {ns}:record          current EncryptedRecord (JSON)
//! {ns}:rotation        RotationSchedule (JSON)
//! {ns}:secret_v{n}     SessionSecret for key version n (base64)
//! {ns}:session         SessionInfo (JSON)
//! ```

use tabvault_core::{KeyValueStore, VaultError};
use tracing::debug;

/// Builds every storage key the application owns under one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    namespace: String,
}

impl StorageKeys {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn record(&self) -> String {
        format!("{}:record", self.namespace)
    }

    pub fn rotation(&self) -> String {
        format!("{}:rotation", self.namespace)
    }

    pub fn secret(&self, version: u32) -> String {
        format!("{}:secret_v{version}", self.namespace)
    }

    pub fn session(&self) -> String {
        format!("{}:session", self.namespace)
    }

    /// Whether `key` belongs to this namespace.
    pub fn owns(&self, key: &str) -> bool {
        key.strip_prefix(self.namespace.as_str())
            .is_some_and(|rest| rest.starts_with(':'))
    }

    /// Key version encoded in a `secret_v{n}` key of this namespace.
    pub fn secret_version(&self, key: &str) -> Option<u32> {
        key.strip_prefix(self.namespace.as_str())?
            .strip_prefix(":secret_v")?
            .parse()
            .ok()
    }

    /// Remove every key this namespace owns from `store`. Returns how many were removed.
    pub fn purge(&self, store: &dyn KeyValueStore) -> Result<usize, VaultError> {
        let owned: Vec<String> = store
            .keys()?
            .into_iter()
            .filter(|k| self.owns(k))
            .collect();
        for key in &owned {
            store.remove(key)?;
        }
        debug!(namespace = %self.namespace, removed = owned.len(), "namespace purged");
        Ok(owned.len())
    }
}
