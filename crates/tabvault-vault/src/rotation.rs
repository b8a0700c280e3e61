// SPDX-FileCopyrightText: 2026 TabVault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key rotation: the version counter, per-version session secrets, and
//! re-encryption of the live record under a new version.
//!
//! Each key version has its own random [`SessionSecret`] in the ephemeral
//! store. A record is always decryptable with the secret of its own
//! `key_version`; the old secret is only deleted after the re-encrypted record
//! has been written, so a crash between the two steps leaves a consistent
//! record/secret pair behind.

use chrono::{DateTime, TimeDelta, Utc};
use tabvault_config::model::VaultConfig;
use tabvault_core::{TabHost, VaultError};
use tabvault_storage::StorageKeys;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::crypto;
use crate::kdf::{self, SessionSecret};
use crate::record::{EncryptedRecord, RotationSchedule, record_aad};

/// Owns the rotation schedule and the per-version secrets of one tab.
#[derive(Debug, Clone)]
pub struct RotationManager {
    host: TabHost,
    keys: StorageKeys,
    interval: TimeDelta,
    kdf_iterations: u32,
}

impl RotationManager {
    pub fn new(host: TabHost, keys: StorageKeys, config: &VaultConfig) -> Self {
        Self {
            host,
            keys,
            interval: config.rotation_interval(),
            kdf_iterations: config.kdf_iterations,
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.host.clock.now()
    }

    /// The stored schedule. An unreadable one is an error.
    pub fn schedule(&self) -> Result<Option<RotationSchedule>, VaultError> {
        match self.host.ephemeral.get(&self.keys.rotation())? {
            Some(json) => RotationSchedule::from_json(&json).map(Some),
            None => Ok(None),
        }
    }

    fn write_schedule(&self, schedule: &RotationSchedule) -> Result<(), VaultError> {
        self.host
            .ephemeral
            .set(&self.keys.rotation(), &schedule.to_json()?)
    }

    /// Load the schedule, creating version 1 (and its secret) if absent.
    ///
    /// An unreadable schedule is replaced by a fresh one. Secrets written
    /// under the old one are dropped first, since version numbering restarts.
    pub fn ensure_schedule(&self) -> Result<RotationSchedule, VaultError> {
        match self.schedule() {
            Ok(Some(schedule)) => {
                self.ensure_secret(schedule.current_version)?;
                Ok(schedule)
            }
            Ok(None) | Err(VaultError::DecryptionFailed) => {
                let orphaned = self.remove_secrets(|_| true)?;
                if orphaned > 0 {
                    warn!(orphaned, "secrets of an unreadable rotation schedule removed");
                }
                let schedule = RotationSchedule::starting_at(self.now(), self.interval);
                self.ensure_secret(schedule.current_version)?;
                self.write_schedule(&schedule)?;
                debug!(next_rotation = %schedule.next_rotation, "rotation schedule created");
                Ok(schedule)
            }
            Err(e) => Err(e),
        }
    }

    /// True when a schedule exists and its next rotation time has passed.
    pub fn is_rotation_due(&self) -> Result<bool, VaultError> {
        Ok(self
            .schedule()?
            .is_some_and(|schedule| schedule.is_due(self.now())))
    }

    /// Generate the secret for the next version and advance the schedule.
    /// Returns the new version.
    ///
    /// Rotating moves `next_rotation` a full interval ahead, so a second call
    /// through [`Self::rotate_if_due`] in the same tick does nothing.
    pub fn rotate(&self) -> Result<u32, VaultError> {
        let current = self.ensure_schedule()?;
        let next = current.advanced(self.now(), self.interval);
        self.write_secret(next.current_version, &SessionSecret::generate()?)?;
        self.write_schedule(&next)?;
        info!(
            key_version = next.current_version,
            next_rotation = %next.next_rotation,
            "session key rotated"
        );
        Ok(next.current_version)
    }

    pub fn rotate_if_due(&self) -> Result<Option<u32>, VaultError> {
        if self.is_rotation_due()? {
            self.rotate().map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn secret(&self, version: u32) -> Result<Option<SessionSecret>, VaultError> {
        match self.host.ephemeral.get(&self.keys.secret(version))? {
            Some(encoded) => SessionSecret::decode(&encoded).map(Some),
            None => Ok(None),
        }
    }

    fn write_secret(&self, version: u32, secret: &SessionSecret) -> Result<(), VaultError> {
        self.host
            .ephemeral
            .set(&self.keys.secret(version), &secret.encode())
    }

    fn ensure_secret(&self, version: u32) -> Result<SessionSecret, VaultError> {
        match self.secret(version) {
            Ok(Some(secret)) => Ok(secret),
            Ok(None) | Err(VaultError::DecryptionFailed) => {
                let secret = SessionSecret::generate()?;
                self.write_secret(version, &secret)?;
                Ok(secret)
            }
            Err(e) => Err(e),
        }
    }

    /// Encrypt `plaintext` under `version` with a fresh salt and nonce.
    pub async fn encrypt(
        &self,
        plaintext: &[u8],
        version: u32,
        fingerprint: String,
        timestamp: DateTime<Utc>,
    ) -> Result<EncryptedRecord, VaultError> {
        let schedule = self.ensure_schedule()?;
        let secret = self.ensure_secret(version)?;
        let salt = kdf::generate_salt()?;
        let key = kdf::derive_key_blocking(secret, salt, self.kdf_iterations).await?;
        let aad = record_aad(version, &fingerprint, timestamp);
        let (ciphertext, iv) = crypto::seal(&key, &aad, plaintext)?;
        Ok(EncryptedRecord {
            iv,
            salt,
            ciphertext,
            timestamp,
            fingerprint,
            key_version: version,
            last_rotation: schedule.last_rotation,
            next_rotation: schedule.next_rotation,
        })
    }

    /// Decrypt `record` with the secret of its own key version.
    pub async fn decrypt(&self, record: &EncryptedRecord) -> Result<Zeroizing<Vec<u8>>, VaultError> {
        let secret = self
            .secret(record.key_version)?
            .ok_or(VaultError::DecryptionFailed)?;
        let key = kdf::derive_key_blocking(secret, record.salt, self.kdf_iterations).await?;
        crypto::open(&key, &record.iv, &record.aad(), &record.ciphertext)
    }

    /// Re-encrypt `record` under `new_version`, write it, then delete the
    /// secret of the record's previous version.
    ///
    /// `timestamp` and `fingerprint` are carried over unchanged.
    pub async fn reencrypt(
        &self,
        record: &EncryptedRecord,
        new_version: u32,
    ) -> Result<EncryptedRecord, VaultError> {
        let plaintext = self.decrypt(record).await?;
        let reencrypted = self
            .encrypt(
                &plaintext,
                new_version,
                record.fingerprint.clone(),
                record.timestamp,
            )
            .await?;
        self.host
            .ephemeral
            .set(&self.keys.record(), &reencrypted.to_json()?)?;
        if record.key_version != new_version {
            self.host
                .ephemeral
                .remove(&self.keys.secret(record.key_version))?;
        }
        debug!(
            from = record.key_version,
            to = new_version,
            "record re-encrypted"
        );
        Ok(reencrypted)
    }

    /// Delete every secret with a version older than `keep`.
    pub fn retire_secrets_before(&self, keep: u32) -> Result<usize, VaultError> {
        self.remove_secrets(|version| version < keep)
    }

    /// Remove the schedule and every per-version secret. Returns how many
    /// keys were present.
    ///
    /// Secrets are found by scanning the namespace, not by counting up to the
    /// schedule's version.
    pub fn clear(&self) -> Result<usize, VaultError> {
        let removed = self.remove_secrets(|_| true)?;
        Ok(removed + self.remove_if_present(&self.keys.rotation())?)
    }

    fn remove_secrets(&self, matches: impl Fn(u32) -> bool) -> Result<usize, VaultError> {
        let doomed: Vec<String> = self
            .host
            .ephemeral
            .keys()?
            .into_iter()
            .filter(|k| self.keys.secret_version(k).is_some_and(&matches))
            .collect();
        for key in &doomed {
            self.host.ephemeral.remove(key)?;
        }
        Ok(doomed.len())
    }

    fn remove_if_present(&self, key: &str) -> Result<usize, VaultError> {
        if self.host.ephemeral.get(key)?.is_some() {
            self.host.ephemeral.remove(key)?;
            Ok(1)
        } else {
            Ok(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tabvault_core::{Clock, KeyValueStore, ManualClock, StaticHost};
    use tabvault_storage::MemoryStore;

    use super::*;
    use crate::fingerprint::fingerprint;

    struct Fixture {
        clock: Arc<ManualClock>,
        store: Arc<MemoryStore>,
        manager: RotationManager,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::starting_now());
        let store = Arc::new(MemoryStore::new());
        let host = TabHost {
            ephemeral: store.clone(),
            persistent: Arc::new(MemoryStore::new()),
            clock: clock.clone(),
            env: Arc::new(StaticHost::new("test-agent")),
        };
        let config = VaultConfig {
            kdf_iterations: 1_000,
            ..VaultConfig::default()
        };
        let manager = RotationManager::new(host, StorageKeys::new("tv"), &config);
        Fixture {
            clock,
            store,
            manager,
        }
    }

    #[test]
    fn schedule_created_lazily_at_version_one() {
        let f = fixture();
        assert!(f.manager.schedule().unwrap().is_none());
        assert!(!f.manager.is_rotation_due().unwrap());

        let schedule = f.manager.ensure_schedule().unwrap();
        assert_eq!(schedule.current_version, 1);
        assert_eq!(schedule.next_rotation, f.clock.now() + TimeDelta::hours(1));
        assert!(f.manager.secret(1).unwrap().is_some());
    }

    #[test]
    fn rotation_due_after_interval() {
        let f = fixture();
        f.manager.ensure_schedule().unwrap();
        f.clock.advance(TimeDelta::minutes(59));
        assert!(!f.manager.is_rotation_due().unwrap());
        f.clock.advance(TimeDelta::minutes(1));
        assert!(f.manager.is_rotation_due().unwrap());
    }

    #[test]
    fn rotate_if_due_does_not_double_rotate() {
        let f = fixture();
        f.manager.ensure_schedule().unwrap();
        f.clock.advance(TimeDelta::hours(2));
        assert_eq!(f.manager.rotate_if_due().unwrap(), Some(2));
        assert_eq!(f.manager.rotate_if_due().unwrap(), None);

        let schedule = f.manager.schedule().unwrap().unwrap();
        assert_eq!(schedule.current_version, 2);
        assert_eq!(schedule.last_rotation, f.clock.now());
        assert_eq!(schedule.next_rotation, f.clock.now() + TimeDelta::hours(1));
    }

    #[test]
    fn rotate_is_unconditional_and_monotonic() {
        let f = fixture();
        assert_eq!(f.manager.rotate().unwrap(), 2);
        assert_eq!(f.manager.rotate().unwrap(), 3);
        assert!(f.manager.secret(3).unwrap().is_some());
    }

    #[tokio::test]
    async fn reencrypt_preserves_payload_and_metadata() {
        let f = fixture();
        let schedule = f.manager.ensure_schedule().unwrap();
        let stamp = f.clock.now();
        let record = f
            .manager
            .encrypt(b"payload", schedule.current_version, fingerprint("abc123"), stamp)
            .await
            .unwrap();

        f.clock.advance(TimeDelta::hours(1));
        let version = f.manager.rotate().unwrap();
        let rotated = f.manager.reencrypt(&record, version).await.unwrap();

        assert_eq!(rotated.key_version, 2);
        assert_eq!(rotated.timestamp, record.timestamp);
        assert_eq!(rotated.fingerprint, record.fingerprint);
        assert_ne!(rotated.salt, record.salt);
        assert_ne!(rotated.iv, record.iv);
        assert_eq!(rotated.next_rotation, f.clock.now() + TimeDelta::hours(1));
        assert_eq!(f.manager.decrypt(&rotated).await.unwrap().as_slice(), b"payload");

        assert!(f.manager.secret(1).unwrap().is_none());
        let stored = f.store.get("tv:record").unwrap().unwrap();
        assert_eq!(EncryptedRecord::from_json(&stored).unwrap(), rotated);
    }

    #[tokio::test]
    async fn reencrypt_fails_when_old_secret_is_gone() {
        let f = fixture();
        f.manager.ensure_schedule().unwrap();
        let record = f
            .manager
            .encrypt(b"payload", 1, fingerprint("abc123"), f.clock.now())
            .await
            .unwrap();
        f.store.remove("tv:secret_v1").unwrap();
        let version = f.manager.rotate().unwrap();
        let err = f.manager.reencrypt(&record, version).await.unwrap_err();
        assert!(matches!(err, VaultError::DecryptionFailed));
    }

    #[tokio::test]
    async fn decrypt_rejects_edited_metadata() {
        let f = fixture();
        f.manager.ensure_schedule().unwrap();
        let record = f
            .manager
            .encrypt(b"payload", 1, fingerprint("abc123"), f.clock.now())
            .await
            .unwrap();
        let mut backdated = record.clone();
        backdated.timestamp += TimeDelta::hours(5);
        assert!(f.manager.decrypt(&backdated).await.is_err());
    }

    #[test]
    fn clear_removes_schedule_and_secrets() {
        let f = fixture();
        f.manager.ensure_schedule().unwrap();
        f.manager.rotate().unwrap();
        f.manager.rotate().unwrap();
        f.store.set("unrelated", "x").unwrap();

        assert_eq!(f.manager.clear().unwrap(), 4);
        assert_eq!(f.store.keys().unwrap(), vec!["unrelated".to_string()]);
        assert_eq!(f.manager.clear().unwrap(), 0);
    }

    #[test]
    fn clear_finds_secrets_when_schedule_unreadable() {
        let f = fixture();
        f.manager.ensure_schedule().unwrap();
        for _ in 0..4 {
            f.manager.rotate().unwrap();
        }
        f.store.set("tv:rotation", "{garbage").unwrap();
        assert_eq!(f.manager.clear().unwrap(), 6);
        assert!(f.store.is_empty());
    }

    #[test]
    fn replacing_unreadable_schedule_drops_its_secrets() {
        let f = fixture();
        f.manager.ensure_schedule().unwrap();
        f.manager.rotate().unwrap();
        f.manager.rotate().unwrap();
        f.store.set("tv:rotation", "{garbage").unwrap();

        let fresh = f.manager.ensure_schedule().unwrap();
        assert_eq!(fresh.current_version, 1);
        assert!(f.store.get("tv:secret_v2").unwrap().is_none());
        assert!(f.store.get("tv:secret_v3").unwrap().is_none());
        assert!(f.manager.secret(1).unwrap().is_some());

        assert_eq!(f.manager.clear().unwrap(), 2);
        assert!(f.store.is_empty());
    }

    #[test]
    fn clear_with_huge_schedule_version_finishes() {
        let f = fixture();
        f.manager.ensure_schedule().unwrap();
        let schedule = RotationSchedule {
            current_version: u32::MAX - 1,
            ..f.manager.schedule().unwrap().unwrap()
        };
        f.store.set("tv:rotation", &schedule.to_json().unwrap()).unwrap();

        assert_eq!(f.manager.clear().unwrap(), 2);
        assert!(f.store.is_empty());
    }

    #[test]
    fn retire_keeps_current_version() {
        let f = fixture();
        f.manager.ensure_schedule().unwrap();
        f.manager.rotate().unwrap();
        f.manager.rotate().unwrap();
        assert_eq!(f.manager.retire_secrets_before(3).unwrap(), 2);
        assert!(f.manager.secret(3).unwrap().is_some());
        assert!(f.manager.secret(2).unwrap().is_none());
    }
}
