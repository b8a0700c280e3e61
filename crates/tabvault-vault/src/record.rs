// SPDX-FileCopyrightText: 2026 TabVault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Versioned JSON layouts for the stored record and the rotation schedule.
//!
//! Both are written with a `"format"` tag. Reading validates the tag, every
//! field type and a few structural rules; any violation is reported the
//! same way a failed decryption is.

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tabvault_core::VaultError;

use crate::crypto::{NONCE_LEN, TAG_LEN};
use crate::kdf::SALT_LEN;

/// One encrypted credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedRecord {
    #[serde(with = "b64_array")]
    pub iv: [u8; NONCE_LEN],
    #[serde(with = "b64_array")]
    pub salt: [u8; SALT_LEN],
    #[serde(with = "b64_vec")]
    pub ciphertext: Vec<u8>,
    /// Time of the last successful store. Carried unchanged through rotation.
    pub timestamp: DateTime<Utc>,
    /// SHA-256 hex of the plaintext token. Carried unchanged through rotation.
    pub fingerprint: String,
    pub key_version: u32,
    pub last_rotation: DateTime<Utc>,
    pub next_rotation: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "format")]
enum StoredRecord {
    #[serde(rename = "v1")]
    V1(EncryptedRecord),
}

impl EncryptedRecord {
    /// Associated data bound into the AEAD tag, so the plaintext metadata
    /// cannot be edited without failing decryption.
    pub fn aad(&self) -> Vec<u8> {
        record_aad(self.key_version, &self.fingerprint, self.timestamp)
    }

    /// Saturates at the latest representable instant.
    pub fn expires_at(&self, expiry: TimeDelta) -> DateTime<Utc> {
        saturating_add(self.timestamp, expiry)
    }

    pub fn is_expired(&self, now: DateTime<Utc>, expiry: TimeDelta) -> bool {
        now > self.expires_at(expiry)
    }

    /// A record stamped after `now` was not written by this tab.
    pub fn is_from_future(&self, now: DateTime<Utc>) -> bool {
        self.timestamp > now
    }

    pub fn to_json(&self) -> Result<String, VaultError> {
        serde_json::to_string(&StoredRecord::V1(self.clone()))
            .map_err(|e| VaultError::Internal(format!("failed to serialize record: {e}")))
    }

    pub fn from_json(json: &str) -> Result<Self, VaultError> {
        let StoredRecord::V1(record) =
            serde_json::from_str(json).map_err(|_| VaultError::DecryptionFailed)?;
        if record.key_version == 0
            || record.ciphertext.len() < TAG_LEN
            || record.fingerprint.len() != 64
            || !record.fingerprint.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return Err(VaultError::DecryptionFailed);
        }
        Ok(record)
    }
}

pub(crate) fn record_aad(key_version: u32, fingerprint: &str, timestamp: DateTime<Utc>) -> Vec<u8> {
    format!(
        "v1|{key_version}|{fingerprint}|{}",
        timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
    )
    .into_bytes()
}

fn saturating_add(at: DateTime<Utc>, by: TimeDelta) -> DateTime<Utc> {
    at.checked_add_signed(by).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Key-version counter and rotation timing for one tab session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationSchedule {
    pub current_version: u32,
    pub last_rotation: DateTime<Utc>,
    pub next_rotation: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "format")]
enum StoredSchedule {
    #[serde(rename = "v1")]
    V1(RotationSchedule),
}

impl RotationSchedule {
    pub fn starting_at(now: DateTime<Utc>, interval: TimeDelta) -> Self {
        Self {
            current_version: 1,
            last_rotation: now,
            next_rotation: saturating_add(now, interval),
        }
    }

    /// The schedule after one rotation at `now`.
    pub fn advanced(&self, now: DateTime<Utc>, interval: TimeDelta) -> Self {
        Self {
            current_version: self.current_version.saturating_add(1),
            last_rotation: now,
            next_rotation: saturating_add(now, interval),
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.next_rotation
    }

    pub fn to_json(&self) -> Result<String, VaultError> {
        serde_json::to_string(&StoredSchedule::V1(*self))
            .map_err(|e| VaultError::Internal(format!("failed to serialize schedule: {e}")))
    }

    pub fn from_json(json: &str) -> Result<Self, VaultError> {
        let StoredSchedule::V1(schedule) =
            serde_json::from_str(json).map_err(|_| VaultError::DecryptionFailed)?;
        if schedule.current_version == 0 || schedule.next_rotation < schedule.last_rotation {
            return Err(VaultError::DecryptionFailed);
        }
        Ok(schedule)
    }
}

mod b64_vec {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(d)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

mod b64_array {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(bytes: &[u8; N], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(d: D) -> Result<[u8; N], D::Error> {
        let encoded = String::deserialize(d)?;
        let raw = STANDARD.decode(encoded).map_err(serde::de::Error::custom)?;
        raw.try_into().map_err(|raw: Vec<u8>| {
            serde::de::Error::custom(format!("expected {N} bytes, got {}", raw.len()))
        })
    }
}
