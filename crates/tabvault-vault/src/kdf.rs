// SPDX-FileCopyrightText: 2026 TabVault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! PBKDF2-HMAC-SHA256 key derivation from a per-tab session secret.
//!
//! One secret per key version, one fresh salt per record.

use std::num::NonZeroU32;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use tabvault_core::VaultError;
use zeroize::Zeroizing;

/// Length of a per-record salt.
pub const SALT_LEN: usize = 16;

/// Length of a session secret and of a derived key.
pub const KEY_LEN: usize = 32;

/// Random 256-bit secret for one key version. Never leaves the ephemeral store.
#[derive(Clone)]
pub struct SessionSecret(Zeroizing<[u8; KEY_LEN]>);

impl std::fmt::Debug for SessionSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionSecret([REDACTED])")
    }
}

impl SessionSecret {
    pub fn generate() -> Result<Self, VaultError> {
        let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
        SystemRandom::new()
            .fill(bytes.as_mut())
            .map_err(|_| VaultError::BrowserIntegrity("secure random source unavailable".into()))?;
        Ok(Self(bytes))
    }

    /// Base64 form written to the ephemeral store.
    pub fn encode(&self) -> Zeroizing<String> {
        Zeroizing::new(STANDARD.encode(self.0.as_ref()))
    }

    /// Parse the stored form. Anything but exactly 32 bytes is rejected.
    pub fn decode(encoded: &str) -> Result<Self, VaultError> {
        let raw = Zeroizing::new(
            STANDARD
                .decode(encoded)
                .map_err(|_| VaultError::DecryptionFailed)?,
        );
        let bytes: [u8; KEY_LEN] = raw
            .as_slice()
            .try_into()
            .map_err(|_| VaultError::DecryptionFailed)?;
        Ok(Self(Zeroizing::new(bytes)))
    }

    pub fn expose(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

/// Derive a 32-byte key from `secret` and `salt`.
///
/// The returned key is wrapped in [`Zeroizing`] for automatic memory zeroing
/// on drop.
pub fn derive_key(
    secret: &SessionSecret,
    salt: &[u8; SALT_LEN],
    iterations: u32,
) -> Result<Zeroizing<[u8; KEY_LEN]>, VaultError> {
    let iterations = NonZeroU32::new(iterations)
        .ok_or_else(|| VaultError::Internal("KDF iteration count must be non-zero".into()))?;
    let mut output = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        salt,
        secret.expose(),
        output.as_mut(),
    );
    Ok(output)
}

/// [`derive_key`] on the blocking pool, so the iterations never stall the
/// task that is driving the vault.
pub async fn derive_key_blocking(
    secret: SessionSecret,
    salt: [u8; SALT_LEN],
    iterations: u32,
) -> Result<Zeroizing<[u8; KEY_LEN]>, VaultError> {
    tokio::task::spawn_blocking(move || derive_key(&secret, &salt, iterations))
        .await
        .map_err(|e| VaultError::Internal(format!("key derivation task failed: {e}")))?
}

/// Generate a random 16-byte salt.
pub fn generate_salt() -> Result<[u8; SALT_LEN], VaultError> {
    let mut salt = [0u8; SALT_LEN];
    SystemRandom::new()
        .fill(&mut salt)
        .map_err(|_| VaultError::BrowserIntegrity("secure random source unavailable".into()))?;
    Ok(salt)
}
