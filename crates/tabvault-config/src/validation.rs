// SPDX-FileCopyrightText: 2026 TabVault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes.

use crate::diagnostic::ConfigError;
use crate::model::TabVaultConfig;

/// Lowest accepted PBKDF2 iteration count.
pub const MIN_KDF_ITERATIONS: u32 = 100_000;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every violation instead of stopping at the first one.
pub fn validate_config(config: &TabVaultConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
        errors.push(ConfigError::validation(format!(
            "logging.level must be one of {}, got `{}`",
            LOG_LEVELS.join(", "),
            config.logging.level
        )));
    }

    let vault = &config.vault;
    if vault.namespace.trim().is_empty() {
        errors.push(ConfigError::validation("vault.namespace must not be empty"));
    } else if vault.namespace.contains(':') {
        errors.push(ConfigError::validation(format!(
            "vault.namespace `{}` must not contain `:`",
            vault.namespace
        )));
    }

    if vault.kdf_iterations < MIN_KDF_ITERATIONS {
        errors.push(ConfigError::validation(format!(
            "vault.kdf_iterations must be at least {MIN_KDF_ITERATIONS}, got {}",
            vault.kdf_iterations
        )));
    }

    for (key, value) in [
        ("vault.credential_expiry_secs", vault.credential_expiry_secs),
        ("vault.rotation_interval_secs", vault.rotation_interval_secs),
        (
            "vault.rotation_check_interval_secs",
            vault.rotation_check_interval_secs,
        ),
        ("session.timeout_secs", config.session.timeout_secs),
        (
            "session.validation_interval_secs",
            config.session.validation_interval_secs,
        ),
        ("session.devtools_poll_secs", config.session.devtools_poll_secs),
    ] {
        if value == 0 {
            errors.push(ConfigError::validation(format!("{key} must be greater than 0")));
        }
    }

    if vault.rotation_interval_secs > vault.credential_expiry_secs {
        errors.push(ConfigError::validation(format!(
            "vault.rotation_interval_secs ({}) must not exceed vault.credential_expiry_secs ({})",
            vault.rotation_interval_secs, vault.credential_expiry_secs
        )));
    }

    if config.session.access_ceiling == 0 {
        errors.push(ConfigError::validation(
            "session.access_ceiling must be at least 1",
        ));
    }

    let audit = &config.audit;
    if audit.report_limit == 0 || audit.report_limit > audit.capacity {
        errors.push(ConfigError::validation(format!(
            "audit.report_limit must be between 1 and audit.capacity ({}), got {}",
            audit.capacity, audit.report_limit
        )));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
