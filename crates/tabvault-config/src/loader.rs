// SPDX-FileCopyrightText: 2026 TabVault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./tabvault.toml` > `~/.config/tabvault/tabvault.toml` > `/etc/tabvault/tabvault.toml`
//! with environment variable overrides via `TABVAULT_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::TabVaultConfig;

/// System-wide configuration file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/tabvault/tabvault.toml";

/// Local configuration file, relative to the working directory.
pub const LOCAL_CONFIG_FILE: &str = "tabvault.toml";

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/tabvault/tabvault.toml` (system-wide)
/// 3. `~/.config/tabvault/tabvault.toml` (user XDG config)
/// 4. `./tabvault.toml` (local directory)
/// 5. `TABVAULT_*` environment variables
pub fn load_config() -> Result<TabVaultConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<TabVaultConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TabVaultConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<TabVaultConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TabVaultConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(TabVaultConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// `~/.config/tabvault/tabvault.toml`, when a config dir exists on this platform.
pub fn user_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|d| d.join("tabvault").join(LOCAL_CONFIG_FILE))
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `TABVAULT_VAULT_KDF_ITERATIONS` must map to
/// `vault.kdf_iterations`, not `vault.kdf.iterations`. Variables outside the
/// four sections (such as `TABVAULT_TOKEN`) are not configuration.
fn env_provider() -> Env {
    const SECTIONS: [&str; 4] = ["logging_", "vault_", "session_", "audit_"];
    Env::prefixed("TABVAULT_")
        .filter(|key| {
            let key = key.as_str().to_ascii_lowercase();
            SECTIONS.iter().any(|section| key.starts_with(section))
        })
        .map(|key| {
            let mapped = key
                .as_str()
                .replacen("logging_", "logging.", 1)
                .replacen("vault_", "vault.", 1)
                .replacen("session_", "session.", 1)
                .replacen("audit_", "audit.", 1);
            mapped.into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn string_overrides_defaults() {
        let config = load_config_from_str("[vault]\nkdf_iterations = 250000\n").unwrap();
        assert_eq!(config.vault.kdf_iterations, 250_000);
        assert_eq!(config.vault.namespace, "tabvault");
    }

    #[test]
    #[serial]
    fn env_var_maps_to_section_key() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("TABVAULT_SESSION_ACCESS_CEILING", "7");
            jail.set_env("TABVAULT_VAULT_ROTATION_INTERVAL_SECS", "120");
            let config = build_figment().extract::<TabVaultConfig>()?;
            assert_eq!(config.session.access_ceiling, 7);
            assert_eq!(config.vault.rotation_interval_secs, 120);
            Ok(())
        });
    }

    #[test]
    #[serial]
    fn non_config_env_vars_are_ignored() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("TABVAULT_TOKEN", "ghp_not_config");
            let config = build_figment().extract::<TabVaultConfig>()?;
            assert_eq!(config.vault.namespace, "tabvault");
            Ok(())
        });
    }

    #[test]
    #[serial]
    fn local_file_is_picked_up() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(LOCAL_CONFIG_FILE, "[audit]\ncapacity = 42\n")?;
            let config = build_figment().extract::<TabVaultConfig>()?;
            assert_eq!(config.audit.capacity, 42);
            Ok(())
        });
    }
}
