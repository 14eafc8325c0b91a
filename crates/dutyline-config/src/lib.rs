// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for Dutyline.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), XDG file hierarchy lookup, environment variable
//! overrides, and miette diagnostic rendering with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use dutyline_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("database: {}", config.storage.database_path);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::DutylineConfig;

/// Load configuration from the XDG hierarchy and validate it.
///
/// The high-level entry point used by the binary:
/// 1. Loads config from TOML files + env vars via Figment
/// 2. On success: runs post-deserialization validation
/// 3. On Figment error: converts to miette diagnostics with typo suggestions
pub fn load_and_validate() -> Result<DutylineConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err)),
    }
}

/// Load configuration from a TOML string and validate it.
///
/// Useful for testing and explicit configuration.
pub fn load_and_validate_str(toml_content: &str) -> Result<DutylineConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_any_file() {
        let config = load_and_validate_str("").expect("defaults should validate");
        assert_eq!(config.gateway.port, 8710);
        assert_eq!(config.escalation.poll_interval_secs, 5);
        assert!(config.slack.bot_token.is_none());
    }

    #[test]
    fn unknown_key_yields_suggestion() {
        let errors = load_and_validate_str("[agent]\nnaem = \"oncall\"\n")
            .expect_err("unknown key must be rejected");
        let rendered = format!("{}", errors[0]);
        assert!(rendered.contains("naem"), "got: {rendered}");
    }

    #[test]
    fn partial_slack_config_is_rejected() {
        let errors = load_and_validate_str("[slack]\nbot_token = \"xoxb-1\"\n")
            .expect_err("signing secret missing");
        assert!(errors
            .iter()
            .any(|e| format!("{e}").contains("slack.signing_secret")));
    }
}
