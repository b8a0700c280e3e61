// SPDX-FileCopyrightText: 2026 TabVault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token acquisition via TTY prompt or the TABVAULT_TOKEN environment variable.

use secrecy::SecretString;
use tabvault_core::VaultError;

/// The environment variable name for providing a token non-interactively.
pub const TOKEN_ENV_VAR: &str = "TABVAULT_TOKEN";

/// Read a credential token without echoing it.
///
/// Priority:
/// 1. `TABVAULT_TOKEN` environment variable (for scripted use)
/// 2. Interactive TTY prompt via `rpassword`
pub fn read_token(prompt: &str) -> Result<SecretString, VaultError> {
    if let Ok(token) = std::env::var(TOKEN_ENV_VAR)
        && !token.is_empty()
    {
        return Ok(SecretString::from(token));
    }

    if std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        let token = rpassword::prompt_password(prompt)
            .map_err(|e| VaultError::Internal(format!("failed to read token: {e}")))?;
        if token.is_empty() {
            return Err(VaultError::Internal("empty token not allowed".to_string()));
        }
        return Ok(SecretString::from(token));
    }

    Err(VaultError::Internal(
        "No token provided. Set TABVAULT_TOKEN or run interactively.".to_string(),
    ))
}
