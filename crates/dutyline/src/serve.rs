// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `dutyline serve` command implementation.
//!
//! Wires storage, the configured transports, the escalation runner, and the
//! HTTP gateway together, then runs until SIGINT/SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use dutyline_config::model::DutylineConfig;
use dutyline_core::{ChatTransport, DutylineError, SmsTransport};
use dutyline_escalation::EscalationRunner;
use dutyline_gateway::auth::AuthConfig;
use dutyline_gateway::{GatewayState, ServerConfig};
use dutyline_slack::SlackClient;
use dutyline_sms::TwilioClient;
use dutyline_storage::Database;
use tracing::{info, warn};

use crate::shutdown;

/// Initialize the tracing subscriber from the configured log level, unless
/// `RUST_LOG` overrides it.
pub fn init_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Build the chat transport if Slack is configured.
pub fn build_chat(config: &DutylineConfig) -> Option<Arc<dyn ChatTransport>> {
    if !config.slack.is_configured() {
        return None;
    }
    let bot_token = config.slack.bot_token.as_deref()?;
    let client = match config.slack.api_base_url.as_deref() {
        Some(base) => SlackClient::with_api_base(bot_token, base),
        None => SlackClient::new(bot_token),
    };
    Some(Arc::new(client))
}

/// Build the SMS transport if Twilio is configured.
pub fn build_sms(config: &DutylineConfig) -> Option<Arc<dyn SmsTransport>> {
    if !config.sms.is_configured() {
        return None;
    }
    let account_sid = config.sms.account_sid.as_deref()?;
    let auth_token = config.sms.auth_token.as_deref()?;
    let from_number = config.sms.from_number.as_deref()?;
    let client = match config.sms.api_base_url.as_deref() {
        Some(base) => TwilioClient::with_api_base(account_sid, auth_token, from_number, base),
        None => TwilioClient::new(account_sid, auth_token, from_number),
    };
    Some(Arc::new(client))
}

/// Runs the `dutyline serve` command.
pub async fn run_serve(config: DutylineConfig) -> Result<(), DutylineError> {
    init_tracing(&config.agent.log_level);
    info!(name = config.agent.name.as_str(), "starting dutyline serve");

    let db = Arc::new(Database::open(&config.storage.database_path).await?);

    let chat = build_chat(&config);
    let sms = build_sms(&config);
    if chat.is_none() {
        warn!("slack is not configured; chat channel disabled");
    }
    if sms.is_none() {
        warn!("sms is not configured; sms channel disabled");
    }
    if config.gateway.api_token.is_none() {
        warn!("gateway.api_token is not set; the REST API will reject all requests");
    }

    let cancel = shutdown::install_signal_handler();

    let runner = EscalationRunner::new(
        db.clone(),
        chat.clone(),
        sms.clone(),
        Duration::from_secs(config.escalation.poll_interval_secs),
    );
    let runner_handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move { runner.run(cancel).await })
    };

    let state = GatewayState {
        db: db.clone(),
        chat,
        sms,
        slack_signing_secret: config.slack.signing_secret.clone(),
        twilio_auth_token: config.sms.auth_token.clone(),
        auth: AuthConfig {
            bearer_token: config.gateway.api_token.clone(),
        },
    };
    let server_config = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
    };

    tokio::select! {
        result = dutyline_gateway::start_server(&server_config, state) => {
            result?;
        }
        _ = cancel.cancelled() => {
            info!("shutdown requested");
        }
    }

    // Let the runner finish its current drain, then checkpoint and close.
    if let Err(e) = runner_handle.await {
        warn!(error = %e, "escalation runner join failed");
    }
    db.close().await?;
    info!("dutyline stopped");
    Ok(())
}
