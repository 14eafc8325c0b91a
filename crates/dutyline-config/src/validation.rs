// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as valid bind addresses and complete channel credential
//! sets.

use crate::diagnostic::ConfigError;
use crate::model::DutylineConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &DutylineConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.gateway.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "gateway.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("gateway.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.escalation.poll_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "escalation.poll_interval_secs must be at least 1".to_string(),
        });
    }

    // A half-configured channel is almost certainly a mistake; require either
    // no credentials or a complete set.
    let slack = &config.slack;
    if slack.bot_token.is_some() && slack.signing_secret.is_none() {
        errors.push(ConfigError::Validation {
            message: "slack.signing_secret is required when slack.bot_token is set".to_string(),
        });
    }
    if slack.signing_secret.is_some() && slack.bot_token.is_none() {
        errors.push(ConfigError::Validation {
            message: "slack.bot_token is required when slack.signing_secret is set".to_string(),
        });
    }

    let sms = &config.sms;
    let sms_any = sms.account_sid.is_some() || sms.auth_token.is_some() || sms.from_number.is_some();
    if sms_any && !sms.is_configured() {
        errors.push(ConfigError::Validation {
            message:
                "sms requires account_sid, auth_token, and from_number to be set together"
                    .to_string(),
        });
    }
    if let Some(from) = sms.from_number.as_deref()
        && !from.starts_with('+')
    {
        errors.push(ConfigError::Validation {
            message: format!("sms.from_number `{from}` must be in E.164 form (+15551234567)"),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
