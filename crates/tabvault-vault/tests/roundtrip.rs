// SPDX-FileCopyrightText: 2026 TabVault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Property tests: any stored credential comes back unchanged, and its
//! fingerprint is the SHA-256 of the token.

use std::sync::Arc;

use proptest::prelude::*;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use tabvault_config::model::{AuditConfig, SessionConfig, VaultConfig};
use tabvault_core::{Credential, ManualClock, StaticHost, TabHost};
use tabvault_security::{RedactionList, SessionMonitor};
use tabvault_storage::{MemoryStore, StorageKeys};
use tabvault_vault::CredentialVault;

fn setup() -> (CredentialVault, SessionMonitor) {
    let host = TabHost {
        ephemeral: Arc::new(MemoryStore::new()),
        persistent: Arc::new(MemoryStore::new()),
        clock: Arc::new(ManualClock::starting_now()),
        env: Arc::new(StaticHost::new("proptest-agent")),
    };
    let config = VaultConfig {
        kdf_iterations: 1_000,
        ..VaultConfig::default()
    };
    let vault = CredentialVault::new(host.clone(), &config);
    let monitor = SessionMonitor::start(
        host,
        StorageKeys::new(config.namespace.clone()),
        SessionConfig::default(),
        &AuditConfig::default(),
        RedactionList::new(),
    );
    (vault, monitor)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn store_then_retrieve_returns_same_pair(
        username in "\\PC{0,32}",
        token in "\\PC{1,128}",
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let (vault, mut monitor) = setup();
        let credential = Credential::new(username.clone(), SecretString::from(token.clone()));

        let (got, status) = rt.block_on(async {
            vault.store(&mut monitor, &credential).await.unwrap();
            let got = vault.retrieve(&mut monitor).await.unwrap().unwrap();
            let status = vault.status(&mut monitor).unwrap().unwrap();
            (got, status)
        });

        prop_assert_eq!(got.username, username);
        prop_assert_eq!(got.token.expose_secret(), token.as_str());
        prop_assert_eq!(status.fingerprint, format!("{:x}", Sha256::digest(token.as_bytes())));
        prop_assert_eq!(status.key_version, 1);
    }
}
