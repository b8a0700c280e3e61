// SPDX-FileCopyrightText: 2026 TabVault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the TabVault credential vault.
//!
//! This crate provides the error taxonomy, shared types, and the traits
//! through which the vault talks to its host: storage, time, and the page.

pub mod error;
pub mod tab;
pub mod traits;
pub mod types;

pub use error::VaultError;
pub use tab::TabHost;
pub use types::{Credential, CredentialStatus, SessionId, Severity, WindowGeometry, secs};

pub use traits::{Clock, HostEnvironment, KeyValueStore, ManualClock, StaticHost, SystemClock};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vault_error_has_all_variants() {
        let _integrity = VaultError::BrowserIntegrity("test".into());
        let _denied = VaultError::AccessDenied {
            reason: "test".into(),
        };
        let _decrypt = VaultError::DecryptionFailed;
        let _expired = VaultError::Expired;
        let _encrypt = VaultError::Encryption("test".into());
        let _storage = VaultError::Storage("test".into());
        let _internal = VaultError::Internal("test".into());
    }

    #[test]
    fn all_seams_are_exported() {
        fn _assert_store<T: KeyValueStore>() {}
        fn _assert_clock<T: Clock>() {}
        fn _assert_host<T: HostEnvironment>() {}
        _assert_clock::<SystemClock>();
        _assert_clock::<ManualClock>();
        _assert_host::<StaticHost>();
    }
}
