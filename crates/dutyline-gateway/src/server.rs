// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state.

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use dutyline_core::{ChatTransport, DutylineError, SmsTransport};
use dutyline_storage::Database;
use tower_http::cors::CorsLayer;

use crate::auth::{auth_middleware, AuthConfig};
use crate::handlers;
use crate::webhooks;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub db: Arc<Database>,
    /// Chat transport, present when Slack is configured.
    pub chat: Option<Arc<dyn ChatTransport>>,
    /// SMS transport, present when Twilio is configured.
    pub sms: Option<Arc<dyn SmsTransport>>,
    /// Slack signing secret; `None` skips verification (tests only).
    pub slack_signing_secret: Option<String>,
    /// Twilio auth token for inbound signature checks; `None` skips (tests only).
    pub twilio_auth_token: Option<String>,
    /// REST API authentication.
    pub auth: AuthConfig,
}

impl GatewayState {
    pub fn chat(&self) -> Option<&dyn ChatTransport> {
        self.chat.as_deref()
    }

    pub fn sms(&self) -> Option<&dyn SmsTransport> {
        self.sms.as_deref()
    }
}

/// Gateway server bind configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Assemble the full gateway router.
pub fn build_router(state: GatewayState) -> Router {
    let auth_state = state.auth.clone();

    // Unauthenticated public routes.
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    // Webhooks authenticate by provider signature inside the handler.
    let webhook_routes = Router::new()
        .route("/webhooks/slack/events", post(webhooks::slack::handle_events))
        .route(
            "/webhooks/slack/interactions",
            post(webhooks::slack::handle_interactions),
        )
        .route("/webhooks/twilio/sms", post(webhooks::twilio::handle_inbound_sms))
        .with_state(state.clone());

    // REST API behind bearer auth.
    let api_routes = Router::new()
        .route("/v1/users", post(handlers::post_users))
        .route("/v1/notifications", post(handlers::post_notifications))
        .route("/v1/notifications", get(handlers::get_notifications))
        .route("/v1/notifications/{id}", get(handlers::get_notification))
        .route(
            "/v1/notifications/{id}/respond",
            post(handlers::post_notification_respond),
        )
        .route(
            "/v1/notifications/{id}/archive",
            post(handlers::post_notification_archive),
        )
        .route(
            "/v1/notifications/{id}/snooze",
            post(handlers::post_notification_snooze),
        )
        .route("/v1/link/slack", post(handlers::post_link_slack))
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(webhook_routes)
        .merge(api_routes)
        .layer(CorsLayer::permissive())
}

/// Bind and serve the gateway until the process exits.
pub async fn start_server(config: &ServerConfig, state: GatewayState) -> Result<(), DutylineError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| DutylineError::Channel {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| DutylineError::Channel {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    Ok(())
}
