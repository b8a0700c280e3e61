// SPDX-FileCopyrightText: 2026 TabVault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the TabVault credential vault.

use thiserror::Error;

/// The primary error type used across all TabVault crates.
///
/// Decryption failures carry no detail. At the UI boundary they surface as
/// "credential absent".
#[derive(Debug, Error)]
pub enum VaultError {
    /// Required crypto primitives are unavailable. Fatal for the session.
    #[error("browser integrity check failed: {0}")]
    BrowserIntegrity(String),

    /// The session monitor refused the operation (ceiling reached or session invalid).
    #[error("access denied: {reason}")]
    AccessDenied { reason: String },

    /// Wrong key, tampered ciphertext, or a malformed stored record.
    #[error("decryption failed")]
    DecryptionFailed,

    /// The stored credential is older than the configured expiry.
    #[error("credential expired")]
    Expired,

    /// Encryption of a credential record failed.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Ephemeral or persistent store errors.
    #[error("storage error: {0}")]
    Storage(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl VaultError {
    /// Shorthand for an access denial with a reason.
    pub fn access_denied(reason: impl Into<String>) -> Self {
        Self::AccessDenied {
            reason: reason.into(),
        }
    }

    /// Whether the caller should stop retrying for the rest of the session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::BrowserIntegrity(_))
    }

    /// Whether this failure is reported to the UI as "no credential stored".
    pub fn collapses_to_absent(&self) -> bool {
        matches!(self, Self::DecryptionFailed | Self::Expired)
    }
}
