// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! REST API handlers.
//!
//! The API is consumed by agent tooling (and the `dutyline` CLI). Auth is a
//! shared bearer token; the acting user is named by email in each request,
//! mirroring how agents are provisioned one key per deployment.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use dutyline_core::{DutylineError, NotificationStatus, User};
use dutyline_dispatch::service;
use dutyline_storage::queries::{notifications, users};

use crate::server::GatewayState;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn internal_error(e: DutylineError) -> Response {
    error!(error = %e, "API handler failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "internal error".to_string(),
        }),
    )
        .into_response()
}

fn not_found(what: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("{what} not found"),
        }),
    )
        .into_response()
}

async fn resolve_user(state: &GatewayState, email: &str) -> Result<Option<User>, DutylineError> {
    users::get_user_by_email(&state.db, email).await
}

/// GET /health
pub async fn get_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Request body for POST /v1/users.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// POST /v1/users
pub async fn post_users(
    State(state): State<GatewayState>,
    Json(body): Json<CreateUserRequest>,
) -> Response {
    match users::get_user_by_email(&state.db, &body.email).await {
        Ok(Some(_)) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "user already exists".to_string(),
            }),
        )
            .into_response(),
        Ok(None) => {
            match users::create_user(&state.db, &body.email, body.name.as_deref(), body.phone.as_deref())
                .await
            {
                Ok(user) => (StatusCode::CREATED, Json(user)).into_response(),
                Err(e) => internal_error(e),
            }
        }
        Err(e) => internal_error(e),
    }
}

/// Request body for POST /v1/notifications.
#[derive(Debug, Deserialize)]
pub struct CreateNotificationRequest {
    pub email: String,
    pub message: String,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub context: Option<serde_json::Value>,
    #[serde(default)]
    pub session_key: Option<String>,
    #[serde(default)]
    pub workspace: Option<String>,
}

/// POST /v1/notifications
///
/// Creates, delivers, and starts escalation for a notification.
pub async fn post_notifications(
    State(state): State<GatewayState>,
    Json(body): Json<CreateNotificationRequest>,
) -> Response {
    let user = match resolve_user(&state, &body.email).await {
        Ok(Some(user)) => user,
        Ok(None) => return not_found("user"),
        Err(e) => return internal_error(e),
    };

    let request = service::CreateNotification {
        message: body.message,
        priority: body.priority,
        options: body.options,
        tags: body.tags,
        context: body.context,
        session_key: body.session_key,
        workspace: body.workspace,
    };

    match service::create_notification(&state.db, state.chat(), state.sms(), &user.id, request)
        .await
    {
        Ok(notification) => (StatusCode::CREATED, Json(notification)).into_response(),
        Err(e) => internal_error(e),
    }
}

/// Query parameters for GET /v1/notifications.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub email: String,
    #[serde(default)]
    pub status: Option<NotificationStatus>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

/// GET /v1/notifications?email=&status=&limit=
pub async fn get_notifications(
    State(state): State<GatewayState>,
    Query(query): Query<ListQuery>,
) -> Response {
    let user = match resolve_user(&state, &query.email).await {
        Ok(Some(user)) => user,
        Ok(None) => return not_found("user"),
        Err(e) => return internal_error(e),
    };

    match notifications::list_for_user(&state.db, &user.id, query.status, query.limit).await {
        Ok(list) => Json(list).into_response(),
        Err(e) => internal_error(e),
    }
}

/// Query parameters for single-notification routes.
#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub email: String,
}

/// GET /v1/notifications/{id} -- id or short code.
pub async fn get_notification(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    Query(query): Query<UserQuery>,
) -> Response {
    let user = match resolve_user(&state, &query.email).await {
        Ok(Some(user)) => user,
        Ok(None) => return not_found("user"),
        Err(e) => return internal_error(e),
    };

    match notifications::find_by_id_or_short_code(&state.db, &id, &user.id).await {
        Ok(Some(notification)) => Json(notification).into_response(),
        Ok(None) => not_found("notification"),
        Err(e) => internal_error(e),
    }
}

/// Request body for POST /v1/notifications/{id}/respond.
#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub email: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub selected_option: Option<String>,
}

/// POST /v1/notifications/{id}/respond
pub async fn post_notification_respond(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    Json(body): Json<RespondRequest>,
) -> Response {
    let user = match resolve_user(&state, &body.email).await {
        Ok(Some(user)) => user,
        Ok(None) => return not_found("user"),
        Err(e) => return internal_error(e),
    };

    match service::respond_to_notification(
        &state.db,
        &user.id,
        &id,
        body.text.as_deref(),
        body.selected_option.as_deref(),
    )
    .await
    {
        Ok(Some(notification)) => Json(notification).into_response(),
        Ok(None) => not_found("notification"),
        Err(e) => internal_error(e),
    }
}

/// Request body for POST /v1/notifications/{id}/archive.
#[derive(Debug, Deserialize)]
pub struct ArchiveRequest {
    pub email: String,
}

/// POST /v1/notifications/{id}/archive
pub async fn post_notification_archive(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    Json(body): Json<ArchiveRequest>,
) -> Response {
    let user = match resolve_user(&state, &body.email).await {
        Ok(Some(user)) => user,
        Ok(None) => return not_found("user"),
        Err(e) => return internal_error(e),
    };

    match service::archive_notification(&state.db, &user.id, &id).await {
        Ok(Some(notification)) => Json(notification).into_response(),
        Ok(None) => not_found("notification"),
        Err(e) => internal_error(e),
    }
}

/// Request body for POST /v1/notifications/{id}/snooze.
#[derive(Debug, Deserialize)]
pub struct SnoozeRequest {
    pub email: String,
    pub seconds: i64,
}

/// POST /v1/notifications/{id}/snooze
pub async fn post_notification_snooze(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    Json(body): Json<SnoozeRequest>,
) -> Response {
    if body.seconds <= 0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "seconds must be positive".to_string(),
            }),
        )
            .into_response();
    }

    let user = match resolve_user(&state, &body.email).await {
        Ok(Some(user)) => user,
        Ok(None) => return not_found("user"),
        Err(e) => return internal_error(e),
    };

    match service::snooze_notification(&state.db, &user.id, &id, body.seconds).await {
        Ok(Some(notification)) => Json(notification).into_response(),
        Ok(None) => not_found("notification"),
        Err(e) => internal_error(e),
    }
}

/// Request body for POST /v1/link/slack.
#[derive(Debug, Deserialize)]
pub struct LinkRequest {
    pub email: String,
}

/// Response body for POST /v1/link/slack.
#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub code: String,
    pub expires_in_secs: u64,
}

/// POST /v1/link/slack -- generate a one-time link code to DM to the bot.
pub async fn post_link_slack(
    State(state): State<GatewayState>,
    Json(body): Json<LinkRequest>,
) -> Response {
    let user = match resolve_user(&state, &body.email).await {
        Ok(Some(user)) => user,
        Ok(None) => return not_found("user"),
        Err(e) => return internal_error(e),
    };

    match service::generate_link_code(&state.db, &user.id).await {
        Ok(code) => Json(LinkResponse {
            code,
            expires_in_secs: 900,
        })
        .into_response(),
        Err(e) => internal_error(e),
    }
}
