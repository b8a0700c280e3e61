// SPDX-FileCopyrightText: 2026 TabVault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential vault: store, retrieve, clear and status over the ephemeral
//! store.
//!
//! Every operation reports to the tab's [`SessionMonitor`]. Cryptographic and
//! integrity failures never reach the caller as errors: the vault clears
//! itself and behaves as if nothing was stored.

use chrono::{DateTime, TimeDelta, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tabvault_config::model::VaultConfig;
use tabvault_core::{Credential, CredentialStatus, Severity, TabHost, VaultError};
use tabvault_security::{SecurityEventKind, SessionMonitor};
use tabvault_storage::StorageKeys;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::crypto;
use crate::fingerprint::{fingerprint, short};
use crate::record::EncryptedRecord;
use crate::rotation::RotationManager;

#[derive(Serialize)]
struct PayloadRef<'a> {
    username: &'a str,
    token: &'a str,
}

#[derive(Deserialize)]
struct Payload {
    username: String,
    token: String,
}

enum Loaded {
    Absent,
    Malformed,
    Present(EncryptedRecord),
}

/// The credential vault of one tab.
///
/// Debug output never includes stored material.
pub struct CredentialVault {
    host: TabHost,
    keys: StorageKeys,
    rotation: RotationManager,
    expiry: TimeDelta,
}

impl std::fmt::Debug for CredentialVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVault")
            .field("namespace", &self.keys.namespace())
            .field("expiry", &self.expiry)
            .field("record", &"[REDACTED]")
            .finish()
    }
}

impl CredentialVault {
    pub fn new(host: TabHost, config: &VaultConfig) -> Self {
        let keys = StorageKeys::new(config.namespace.clone());
        Self {
            rotation: RotationManager::new(host.clone(), keys.clone(), config),
            host,
            keys,
            expiry: config.credential_expiry(),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.host.clock.now()
    }

    /// Encrypt and store `credential`, replacing any previous one.
    ///
    /// Fails with `AccessDenied` when the monitor refuses the operation and
    /// with `BrowserIntegrity` when the crypto self-test fails; nothing is
    /// written in either case.
    pub async fn store(
        &self,
        monitor: &mut SessionMonitor,
        credential: &Credential,
    ) -> Result<(), VaultError> {
        monitor.authorize("store")?;

        if let Err(e) = crypto::ensure_available() {
            monitor.log_security_event(
                SecurityEventKind::IntegrityFailure,
                e.to_string(),
                Severity::Critical,
            );
            return Err(e);
        }

        let now = self.now();
        let mut schedule = self.rotation.ensure_schedule()?;
        if schedule.is_due(now) {
            let version = self.rotation.rotate()?;
            monitor.log_security_event(
                SecurityEventKind::KeyRotated,
                format!("rotated to key version {version} before store"),
                Severity::Low,
            );
            schedule = self.rotation.ensure_schedule()?;
        }

        let token = credential.token.expose_secret();
        let fp = fingerprint(token);
        let payload = Zeroizing::new(
            serde_json::to_vec(&PayloadRef {
                username: &credential.username,
                token,
            })
            .map_err(|e| VaultError::Encryption(format!("failed to encode credential: {e}")))?,
        );

        let record = self
            .rotation
            .encrypt(&payload, schedule.current_version, fp.clone(), now)
            .await?;
        self.host
            .ephemeral
            .set(&self.keys.record(), &record.to_json()?)?;

        let retired = self
            .rotation
            .retire_secrets_before(schedule.current_version)?;
        if retired > 0 {
            debug!(retired, "unused key versions removed");
        }

        monitor.redactions().replace(token);
        monitor.log_security_event(
            SecurityEventKind::CredentialStored,
            format!(
                "credential stored for {} (fingerprint {}, key version {})",
                credential.username,
                short(&fp),
                record.key_version
            ),
            Severity::Medium,
        );
        info!(key_version = record.key_version, "credential stored");
        Ok(())
    }

    /// Decrypt the stored credential.
    ///
    /// Returns `None` when nothing is stored, or after clearing an expired,
    /// corrupted or undecryptable record. A due rotation (or a record left
    /// behind on an older key version) is handled first, then the record is
    /// read again, at most once.
    pub async fn retrieve(
        &self,
        monitor: &mut SessionMonitor,
    ) -> Result<Option<Credential>, VaultError> {
        monitor.authorize("retrieve")?;

        let mut reencrypted = false;
        loop {
            let record = match self.load()? {
                Loaded::Absent => return Ok(None),
                Loaded::Malformed => {
                    self.discard_malformed(monitor, "stored record failed validation")?;
                    return Ok(None);
                }
                Loaded::Present(record) => record,
            };

            let now = self.now();
            if let Err(e) = self.check_age(&record, now) {
                self.discard_aged(monitor, &e)?;
                return Ok(None);
            }

            if !reencrypted {
                let schedule = match self.rotation.schedule() {
                    Ok(schedule) => schedule,
                    Err(VaultError::DecryptionFailed) => {
                        self.discard_malformed(monitor, "rotation schedule failed validation")?;
                        return Ok(None);
                    }
                    Err(e) => return Err(e),
                };

                let target = match schedule {
                    Some(s) if s.is_due(now) => {
                        let version = self.rotation.rotate()?;
                        monitor.log_security_event(
                            SecurityEventKind::KeyRotated,
                            format!("rotated to key version {version} on retrieve"),
                            Severity::Low,
                        );
                        Some(version)
                    }
                    Some(s) if record.key_version < s.current_version => Some(s.current_version),
                    _ => None,
                };

                if let Some(version) = target {
                    reencrypted = true;
                    if !self.reencrypt_or_discard(monitor, &record, version).await? {
                        return Ok(None);
                    }
                    continue;
                }
            }

            return match self.open(&record).await {
                Ok(credential) => {
                    monitor.redactions().add(credential.token.expose_secret());
                    monitor.log_security_event(
                        SecurityEventKind::CredentialRetrieved,
                        format!(
                            "credential retrieved for {} (fingerprint {})",
                            credential.username,
                            short(&record.fingerprint)
                        ),
                        Severity::Low,
                    );
                    Ok(Some(credential))
                }
                Err(e) if e.collapses_to_absent() => {
                    self.discard(
                        monitor,
                        SecurityEventKind::DecryptionFailed,
                        "stored credential could not be decrypted and was cleared",
                        Severity::High,
                    )?;
                    Ok(None)
                }
                Err(e) => Err(e),
            };
        }
    }

    /// Remove the record, the schedule and every per-version secret, and
    /// stop redacting the token. Idempotent.
    pub fn clear(&self, monitor: &mut SessionMonitor) -> Result<(), VaultError> {
        let removed = self.wipe()?;
        monitor.redactions().clear();
        if removed > 0 {
            monitor.log_security_event(
                SecurityEventKind::CredentialCleared,
                format!("credential cleared ({removed} keys removed)"),
                Severity::Medium,
            );
            info!(removed, "credential cleared");
        }
        Ok(())
    }

    /// Expiry, fingerprint and key version of the stored credential, without
    /// decrypting it. Clears and returns `None` if it has expired.
    pub fn status(
        &self,
        monitor: &mut SessionMonitor,
    ) -> Result<Option<CredentialStatus>, VaultError> {
        let record = match self.load()? {
            Loaded::Absent => return Ok(None),
            Loaded::Malformed => {
                self.discard_malformed(monitor, "stored record failed validation")?;
                return Ok(None);
            }
            Loaded::Present(record) => record,
        };

        if let Err(e) = self.check_age(&record, self.now()) {
            self.discard_aged(monitor, &e)?;
            return Ok(None);
        }

        let next_rotation = match self.rotation.schedule() {
            Ok(Some(schedule)) => schedule.next_rotation,
            _ => record.next_rotation,
        };
        Ok(Some(CredentialStatus {
            expires_at: record.expires_at(self.expiry),
            fingerprint: record.fingerprint,
            key_version: record.key_version,
            next_rotation,
        }))
    }

    /// Background rotation check: rotate when due and re-encrypt the live
    /// record under the new version. Returns the new version, if any.
    pub async fn rotate_if_due(
        &self,
        monitor: &mut SessionMonitor,
    ) -> Result<Option<u32>, VaultError> {
        let version = match self.rotation.rotate_if_due() {
            Ok(Some(version)) => version,
            Ok(None) => return Ok(None),
            Err(VaultError::DecryptionFailed) => {
                self.discard_malformed(monitor, "rotation schedule failed validation")?;
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        monitor.log_security_event(
            SecurityEventKind::KeyRotated,
            format!("rotated to key version {version}"),
            Severity::Low,
        );

        match self.load()? {
            Loaded::Absent => {}
            Loaded::Malformed => {
                self.discard_malformed(monitor, "stored record failed validation")?;
            }
            Loaded::Present(record) => match self.check_age(&record, self.now()) {
                Ok(()) => {
                    self.reencrypt_or_discard(monitor, &record, version).await?;
                }
                Err(e) => self.discard_aged(monitor, &e)?,
            },
        }
        Ok(Some(version))
    }

    fn load(&self) -> Result<Loaded, VaultError> {
        Ok(match self.host.ephemeral.get(&self.keys.record())? {
            None => Loaded::Absent,
            Some(json) => match EncryptedRecord::from_json(&json) {
                Ok(record) => Loaded::Present(record),
                Err(_) => Loaded::Malformed,
            },
        })
    }

    /// `Expired` once the record outlives the configured expiry, and
    /// `DecryptionFailed` for a record stamped after `now`.
    fn check_age(&self, record: &EncryptedRecord, now: DateTime<Utc>) -> Result<(), VaultError> {
        if record.is_from_future(now) {
            Err(VaultError::DecryptionFailed)
        } else if record.is_expired(now, self.expiry) {
            Err(VaultError::Expired)
        } else {
            Ok(())
        }
    }

    async fn open(&self, record: &EncryptedRecord) -> Result<Credential, VaultError> {
        let plaintext = self.rotation.decrypt(record).await?;
        let payload: Payload =
            serde_json::from_slice(&plaintext).map_err(|_| VaultError::DecryptionFailed)?;
        Ok(Credential::new(
            payload.username,
            SecretString::from(payload.token),
        ))
    }

    /// Returns `false` if the record had to be discarded.
    async fn reencrypt_or_discard(
        &self,
        monitor: &mut SessionMonitor,
        record: &EncryptedRecord,
        version: u32,
    ) -> Result<bool, VaultError> {
        match self.rotation.reencrypt(record, version).await {
            Ok(_) => {
                monitor.log_security_event(
                    SecurityEventKind::KeyRotated,
                    format!(
                        "record re-encrypted from key version {} to {version}",
                        record.key_version
                    ),
                    Severity::Low,
                );
                Ok(true)
            }
            Err(e) => {
                debug!(error = %e, "re-encryption failed");
                self.discard(
                    monitor,
                    SecurityEventKind::ReencryptionFailed,
                    format!(
                        "re-encryption to key version {version} failed, credential cleared"
                    ),
                    Severity::High,
                )?;
                Ok(false)
            }
        }
    }

    fn discard_expired(&self, monitor: &mut SessionMonitor) -> Result<(), VaultError> {
        self.discard(
            monitor,
            SecurityEventKind::CredentialExpired,
            format!(
                "credential older than {}s cleared",
                self.expiry.num_seconds()
            ),
            Severity::Medium,
        )
    }

    fn discard_aged(&self, monitor: &mut SessionMonitor, err: &VaultError) -> Result<(), VaultError> {
        match err {
            VaultError::Expired => self.discard_expired(monitor),
            _ => self.discard_malformed(monitor, "stored record is dated in the future"),
        }
    }

    fn discard_malformed(
        &self,
        monitor: &mut SessionMonitor,
        details: &str,
    ) -> Result<(), VaultError> {
        self.discard(
            monitor,
            SecurityEventKind::RecordMalformed,
            format!("{details}, credential cleared"),
            Severity::High,
        )
    }

    fn discard(
        &self,
        monitor: &mut SessionMonitor,
        kind: SecurityEventKind,
        details: impl Into<String>,
        severity: Severity,
    ) -> Result<(), VaultError> {
        self.wipe()?;
        monitor.redactions().clear();
        monitor.log_security_event(kind, details, severity);
        Ok(())
    }

    fn wipe(&self) -> Result<usize, VaultError> {
        let record_key = self.keys.record();
        let mut removed = 0;
        if self.host.ephemeral.get(&record_key)?.is_some() {
            self.host.ephemeral.remove(&record_key)?;
            removed += 1;
        }
        Ok(removed + self.rotation.clear()?)
    }
}

/// Mask a secret for display: first and last four characters, or `****`
/// for anything shorter than ten characters.
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() < 10 {
        return "****".to_string();
    }
    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{prefix}...{suffix}")
}
