// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Dutyline.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Dutyline configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values; the Slack and SMS sections stay unconfigured until credentials
/// are supplied.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DutylineConfig {
    /// Service identity and logging settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// SQLite storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP gateway settings (webhooks + REST API).
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Slack channel settings.
    #[serde(default)]
    pub slack: SlackConfig,

    /// Twilio SMS channel settings.
    #[serde(default)]
    pub sms: SmsConfig,

    /// Escalation scheduler settings.
    #[serde(default)]
    pub escalation: EscalationConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name used in guidance messages.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
        }
    }
}

/// SQLite storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Host address to bind.
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bearer token for the REST API. When unset, all API requests are
    /// rejected (fail-closed); webhook routes authenticate by signature
    /// instead and are unaffected.
    #[serde(default)]
    pub api_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            api_token: None,
        }
    }
}

/// Slack channel configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SlackConfig {
    /// Bot token (`xoxb-...`) for Web API calls.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Signing secret for inbound webhook verification.
    #[serde(default)]
    pub signing_secret: Option<String>,

    /// Override the Slack API base URL (testing only).
    #[serde(default)]
    pub api_base_url: Option<String>,
}

impl SlackConfig {
    /// Whether the Slack channel is fully configured.
    pub fn is_configured(&self) -> bool {
        self.bot_token.is_some() && self.signing_secret.is_some()
    }
}

/// Twilio SMS channel configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SmsConfig {
    /// Twilio account SID.
    #[serde(default)]
    pub account_sid: Option<String>,

    /// Twilio auth token (also used for inbound signature verification).
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Sending number in E.164 form.
    #[serde(default)]
    pub from_number: Option<String>,

    /// Override the Twilio API base URL (testing only).
    #[serde(default)]
    pub api_base_url: Option<String>,
}

impl SmsConfig {
    /// Whether the SMS channel is fully configured.
    pub fn is_configured(&self) -> bool {
        self.account_sid.is_some() && self.auth_token.is_some() && self.from_number.is_some()
    }
}

/// Escalation scheduler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EscalationConfig {
    /// How often the driver polls for due escalation jobs, in seconds.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

fn default_agent_name() -> String {
    "dutyline".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("dutyline/dutyline.db").display().to_string())
        .unwrap_or_else(|| "dutyline.db".to_string())
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    8710
}

fn default_poll_interval_secs() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slack_config_requires_both_credentials() {
        let mut slack = SlackConfig::default();
        assert!(!slack.is_configured());
        slack.bot_token = Some("xoxb-1".into());
        assert!(!slack.is_configured());
        slack.signing_secret = Some("secret".into());
        assert!(slack.is_configured());
    }

    #[test]
    fn sms_config_requires_all_three_credentials() {
        let sms = SmsConfig {
            account_sid: Some("AC123".into()),
            auth_token: Some("token".into()),
            from_number: None,
            api_base_url: None,
        };
        assert!(!sms.is_configured());
    }
}
