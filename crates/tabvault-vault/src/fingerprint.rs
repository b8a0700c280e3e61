// SPDX-FileCopyrightText: 2026 TabVault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-way token fingerprint for display and audit correlation.

use ring::digest::{SHA256, digest};

/// Lowercase hex SHA-256 of `token`.
pub fn fingerprint(token: &str) -> String {
    hex::encode(digest(&SHA256, token.as_bytes()).as_ref())
}

/// First and last four hex digits, for log lines and audit details.
pub fn short(fingerprint: &str) -> String {
    match (fingerprint.get(..4), fingerprint.get(fingerprint.len().saturating_sub(4)..)) {
        (Some(head), Some(tail)) if fingerprint.len() > 8 => format!("{head}..{tail}"),
        _ => fingerprint.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::{Digest, Sha256};

    #[test]
    fn known_answer() {
        assert_eq!(
            fingerprint("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn matches_independent_sha256() {
        for token in ["abc123", "", "ghp_0123456789abcdefghij", "ünïcödé"] {
            assert_eq!(fingerprint(token), hex::encode(Sha256::digest(token.as_bytes())));
        }
    }

    #[test]
    fn short_form() {
        let fp = fingerprint("abc");
        assert_eq!(short(&fp), "ba78..15ad");
        assert_eq!(short("abcd"), "abcd");
    }
}
