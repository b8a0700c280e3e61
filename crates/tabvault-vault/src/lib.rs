// SPDX-FileCopyrightText: 2026 TabVault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AES-256-GCM credential vault for one browser tab.
//!
//! A random 256-bit session secret per key version lives in the tab's
//! ephemeral store. Each stored record is sealed under a key derived from
//! that secret and a fresh salt via PBKDF2-HMAC-SHA256, and the active
//! version is rotated on a timer with the live record re-encrypted under
//! the new key.

pub mod crypto;
pub mod fingerprint;
pub mod kdf;
pub mod record;
pub mod rotation;
pub mod vault;

pub use fingerprint::fingerprint;
pub use kdf::SessionSecret;
pub use record::{EncryptedRecord, RotationSchedule};
pub use rotation::RotationManager;
pub use vault::{CredentialVault, mask_secret};
