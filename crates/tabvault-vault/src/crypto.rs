// SPDX-FileCopyrightText: 2026 TabVault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Low-level AES-256-GCM seal/open operations.
//!
//! Every call to [`seal`] generates a fresh random 96-bit nonce via the system
//! CSPRNG. Nonce reuse would be catastrophic for GCM security.

use ring::aead::{AES_256_GCM, Aad, LessSafeKey, Nonce, UnboundKey};
use ring::digest;
use ring::rand::{SecureRandom, SystemRandom};
use tabvault_core::VaultError;
use zeroize::Zeroizing;

/// Length of a GCM nonce.
pub const NONCE_LEN: usize = 12;

/// Length of the authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

const SHA256_ABC: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

/// Encrypt plaintext with AES-256-GCM using a random 96-bit nonce.
///
/// `aad` is authenticated but not encrypted. Returns
/// `(ciphertext_with_tag, nonce_bytes)`.
pub fn seal(
    key: &[u8; 32],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<(Vec<u8>, [u8; NONCE_LEN]), VaultError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key)
        .map_err(|_| VaultError::Encryption("failed to create AES-256-GCM key".to_string()))?;
    let less_safe = LessSafeKey::new(unbound);

    let mut nonce_bytes = [0u8; NONCE_LEN];
    SystemRandom::new()
        .fill(&mut nonce_bytes)
        .map_err(|_| VaultError::BrowserIntegrity("secure random source unavailable".into()))?;
    let nonce = Nonce::assume_unique_for_key(nonce_bytes);

    let mut in_out = plaintext.to_vec();
    less_safe
        .seal_in_place_append_tag(nonce, Aad::from(aad), &mut in_out)
        .map_err(|_| VaultError::Encryption("AES-256-GCM encryption failed".to_string()))?;

    Ok((in_out, nonce_bytes))
}

/// Decrypt ciphertext with AES-256-GCM.
///
/// Wrong key, wrong `aad`, a modified nonce or a modified ciphertext all
/// produce the same [`VaultError::DecryptionFailed`].
pub fn open(
    key: &[u8; 32],
    nonce_bytes: &[u8; NONCE_LEN],
    aad: &[u8],
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>, VaultError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key).map_err(|_| VaultError::DecryptionFailed)?;
    let less_safe = LessSafeKey::new(unbound);
    let nonce = Nonce::assume_unique_for_key(*nonce_bytes);

    let mut in_out = Zeroizing::new(ciphertext.to_vec());
    let plaintext = less_safe
        .open_in_place(nonce, Aad::from(aad), in_out.as_mut_slice())
        .map_err(|_| VaultError::DecryptionFailed)?;

    Ok(Zeroizing::new(plaintext.to_vec()))
}

/// Check that the primitives the vault depends on work before anything is
/// written: the secure random source and a SHA-256 known-answer test.
pub fn ensure_available() -> Result<(), VaultError> {
    let mut sample = [0u8; 16];
    SystemRandom::new()
        .fill(&mut sample)
        .map_err(|_| VaultError::BrowserIntegrity("secure random source unavailable".into()))?;

    let kat = digest::digest(&digest::SHA256, b"abc");
    if hex::encode(kat.as_ref()) != SHA256_ABC {
        return Err(VaultError::BrowserIntegrity(
            "SHA-256 self-test failed".into(),
        ));
    }
    Ok(())
}
