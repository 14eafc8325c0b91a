// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports the XDG hierarchy: `./dutyline.toml` > `~/.config/dutyline/dutyline.toml`
//! > `/etc/dutyline/dutyline.toml`, with environment variable overrides via
//! the `DUTYLINE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::DutylineConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/dutyline/dutyline.toml` (system-wide)
/// 3. `~/.config/dutyline/dutyline.toml` (user XDG config)
/// 4. `./dutyline.toml` (local directory)
/// 5. `DUTYLINE_*` environment variables
pub fn load_config() -> Result<DutylineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DutylineConfig::default()))
        .merge(Toml::file("/etc/dutyline/dutyline.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("dutyline/dutyline.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("dutyline.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<DutylineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DutylineConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<DutylineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DutylineConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `DUTYLINE_SLACK_BOT_TOKEN` must map to
/// `slack.bot_token`, not `slack.bot.token`.
fn env_provider() -> Env {
    Env::prefixed("DUTYLINE_").map(|key| {
        // `key` is the lowercased env var name with the prefix stripped,
        // e.g. DUTYLINE_SLACK_BOT_TOKEN -> "slack_bot_token".
        let mapped = key
            .as_str()
            .replacen("agent_", "agent.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("gateway_", "gateway.", 1)
            .replacen("slack_", "slack.", 1)
            .replacen("sms_", "sms.", 1)
            .replacen("escalation_", "escalation.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_string_overrides_defaults() {
        let config = load_config_from_str(
            "[gateway]\nport = 9000\n\n[storage]\ndatabase_path = \"/tmp/t.db\"\n",
        )
        .expect("valid toml");
        assert_eq!(config.gateway.port, 9000);
        assert_eq!(config.storage.database_path, "/tmp/t.db");
        // Untouched sections keep defaults.
        assert_eq!(config.agent.log_level, "info");
    }

    #[test]
    fn unknown_section_key_is_an_error() {
        let result = load_config_from_str("[gateway]\nprot = 9000\n");
        assert!(result.is_err());
    }
}
