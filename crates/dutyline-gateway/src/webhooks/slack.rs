// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slack webhook handlers: the Events API and interactive payloads.
//!
//! Routing rules for `event_callback` messages:
//! - anything with a `bot_id` (including our own posts) is ignored
//! - subtypes other than `file_share` are ignored
//! - replies inside a thread resolve through the correlator
//! - top-level DMs parse like SMS, with link-code handling first
//!
//! Every verified request is acknowledged with 200 regardless of what
//! happens inside; the only non-2xx is a failed signature check.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, warn};

use dutyline_core::{Channel, ChatTransport, DutylineError, Notification, User};
use dutyline_dispatch::{correlate, parser, record};
use dutyline_storage::queries::{notifications, users};

use crate::server::GatewayState;

#[derive(Debug, Deserialize)]
struct EventEnvelope {
    #[serde(rename = "type")]
    kind: String,
    challenge: Option<String>,
    event: Option<MessageEvent>,
}

#[derive(Debug, Deserialize)]
struct MessageEvent {
    #[serde(rename = "type")]
    kind: String,
    user: Option<String>,
    text: Option<String>,
    channel: Option<String>,
    channel_type: Option<String>,
    subtype: Option<String>,
    thread_ts: Option<String>,
    ts: Option<String>,
    bot_id: Option<String>,
    files: Option<Vec<FileAttachment>>,
}

#[derive(Debug, Deserialize)]
struct FileAttachment {
    name: String,
    permalink: String,
}

#[derive(Debug, Deserialize)]
struct InteractionForm {
    payload: String,
}

#[derive(Debug, Deserialize)]
struct InteractionPayload {
    #[serde(rename = "type")]
    kind: String,
    user: InteractionUser,
    actions: Option<Vec<BlockAction>>,
    container: Option<Container>,
    trigger_id: Option<String>,
    view: Option<SubmittedView>,
}

#[derive(Debug, Deserialize)]
struct InteractionUser {
    id: String,
}

#[derive(Debug, Deserialize)]
struct BlockAction {
    action_id: String,
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Container {
    message_ts: Option<String>,
    channel_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubmittedView {
    callback_id: String,
    private_metadata: String,
    state: ViewState,
}

#[derive(Debug, Deserialize)]
struct ViewState {
    values: std::collections::HashMap<
        String,
        std::collections::HashMap<String, ViewInputValue>,
    >,
}

#[derive(Debug, Deserialize)]
struct ViewInputValue {
    value: Option<String>,
}

/// Coordinates stashed in the response modal so the submission callback can
/// update the originating message.
#[derive(Debug, Serialize, Deserialize)]
struct ModalMetadata {
    notification_id: String,
    short_code: String,
    message: String,
    channel_id: Option<String>,
    message_ts: Option<String>,
}

fn ack() -> Response {
    "OK".into_response()
}

fn verify(state: &GatewayState, headers: &HeaderMap, body: &str) -> bool {
    let Some(secret) = state.slack_signing_secret.as_deref() else {
        return true;
    };
    let timestamp = headers
        .get("x-slack-request-timestamp")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let signature = headers
        .get("x-slack-signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    dutyline_slack::verify_signature(secret, timestamp, body, signature)
}

/// POST /webhooks/slack/events
pub async fn handle_events(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if !verify(&state, &headers, &body) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let envelope: EventEnvelope = match serde_json::from_str(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, "malformed slack event payload");
            return ack();
        }
    };

    match envelope.kind.as_str() {
        "url_verification" => {
            Json(json!({ "challenge": envelope.challenge.unwrap_or_default() })).into_response()
        }
        "event_callback" => {
            if let Some(event) = envelope.event
                && let Err(e) = route_event(&state, event).await
            {
                error!(error = %e, "slack event handling failed");
            }
            ack()
        }
        _ => ack(),
    }
}

async fn route_event(state: &GatewayState, event: MessageEvent) -> Result<(), DutylineError> {
    // Ignore bot messages, including our own.
    if event.bot_id.is_some() {
        return Ok(());
    }
    // Skip subtypes we don't care about; file_share carries user uploads.
    if let Some(subtype) = event.subtype.as_deref()
        && subtype != "file_share"
    {
        return Ok(());
    }
    if event.kind != "message" {
        return Ok(());
    }

    if event.thread_ts.is_some() {
        return handle_thread_reply(state, event).await;
    }
    if event.channel_type.as_deref() == Some("im") {
        return handle_dm(state, event).await;
    }
    Ok(())
}

/// Reply text plus any file attachments as markdown links.
fn text_with_files(event: &MessageEvent) -> String {
    let mut text = event.text.as_deref().unwrap_or_default().trim().to_string();
    if let Some(files) = &event.files
        && !files.is_empty()
    {
        let lines: Vec<String> = files
            .iter()
            .map(|f| format!("[{}]({})", f.name, f.permalink))
            .collect();
        if text.is_empty() {
            text = lines.join("\n");
        } else {
            text = format!("{text}\n{}", lines.join("\n"));
        }
    }
    text
}

async fn handle_thread_reply(
    state: &GatewayState,
    event: MessageEvent,
) -> Result<(), DutylineError> {
    let (Some(slack_user), Some(thread_ts)) = (event.user.as_deref(), event.thread_ts.as_deref())
    else {
        return Ok(());
    };

    let Some((notification, user)) =
        correlate::resolve_thread_reply(&state.db, slack_user, thread_ts).await?
    else {
        // Unknown thread or unlinked sender: no-op, never error back.
        return Ok(());
    };

    let text = text_with_files(&event);
    if text.is_empty() {
        return Ok(());
    }

    // Numeric selection works in threads too.
    if parser::is_option_selection(&text)
        && let Ok(n) = text.parse::<usize>()
        && n >= 1
        && n <= notification.options.len()
    {
        let option = notification.options[n - 1].clone();
        record::record_response(
            &state.db,
            &notification,
            &user.id,
            Channel::Slack,
            None,
            Some(&option),
            event.ts.as_deref(),
        )
        .await?;
        return Ok(());
    }

    // Freeform: recorded regardless of notification status.
    record::record_response(
        &state.db,
        &notification,
        &user.id,
        Channel::Slack,
        Some(&text),
        None,
        event.ts.as_deref(),
    )
    .await?;
    Ok(())
}

/// Match a `LINK-XXXXXX` code, tolerating lowercase input.
fn extract_link_code(text: &str) -> Option<String> {
    let upper = text.trim().to_uppercase();
    let suffix = upper.strip_prefix("LINK-")?;
    let valid = suffix.len() == 6
        && suffix
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit());
    valid.then_some(upper)
}

async fn post_dm(state: &GatewayState, channel: &str, text: &str) {
    let Some(chat) = state.chat() else { return };
    if let Err(e) = chat.post_text(channel, text, None).await {
        warn!(error = %e, "failed to post slack guidance reply");
    }
}

async fn handle_dm(state: &GatewayState, event: MessageEvent) -> Result<(), DutylineError> {
    let (Some(slack_user), Some(channel)) = (event.user.as_deref(), event.channel.as_deref())
    else {
        return Ok(());
    };

    let raw = event.text.as_deref().unwrap_or_default().trim();
    if let Some(code) = extract_link_code(raw) {
        return handle_link_code(state, slack_user, channel, &code).await;
    }

    let Some(user) = users::get_user_by_slack_id(&state.db, slack_user).await? else {
        post_dm(
            state,
            channel,
            "I don't recognize your Slack account. To link your account, run \
             `dutyline link` in your terminal and DM me the code.",
        )
        .await;
        return Ok(());
    };

    let text = text_with_files(&event);
    if text.is_empty() {
        return Ok(());
    }

    match parser::parse_inbound(&state.db, &text, &user.id).await? {
        parser::Intent::ShortCodeReply { notification, text } => {
            record_slack_response(state, &notification, &user, Some(&text), None, &event).await?;
        }
        parser::Intent::OptionSelected {
            notification,
            option,
        } => {
            record_slack_response(state, &notification, &user, None, Some(&option), &event).await?;
        }
        parser::Intent::FreeformReply { notification, text } => {
            record_slack_response(state, &notification, &user, Some(&text), None, &event).await?;
        }
        parser::Intent::InvalidOption => {
            post_dm(state, channel, "Invalid option number. Please try again.").await;
        }
        parser::Intent::NotFound { short_code } => {
            post_dm(
                state,
                channel,
                &format!("No active notification found with code {short_code}."),
            )
            .await;
        }
        parser::Intent::NoActiveTarget => {
            // The user might just be chatting; stay quiet.
            debug!("slack DM with no active target ignored");
        }
    }
    Ok(())
}

async fn record_slack_response(
    state: &GatewayState,
    notification: &Notification,
    user: &User,
    text: Option<&str>,
    selected_option: Option<&str>,
    event: &MessageEvent,
) -> Result<(), DutylineError> {
    record::record_response(
        &state.db,
        notification,
        &user.id,
        Channel::Slack,
        text,
        selected_option,
        event.ts.as_deref(),
    )
    .await
}

async fn handle_link_code(
    state: &GatewayState,
    slack_user: &str,
    channel: &str,
    code: &str,
) -> Result<(), DutylineError> {
    let Some(user) = users::find_user_by_link_code(&state.db, code).await? else {
        post_dm(
            state,
            channel,
            "Invalid or expired link code. Run `dutyline link` to generate a new one.",
        )
        .await;
        return Ok(());
    };

    users::link_slack_account(&state.db, &user.id, slack_user, None).await?;
    post_dm(
        state,
        channel,
        &format!(
            "Linked! Your Slack account is now connected to {}. \
             You'll receive notifications here.",
            user.email
        ),
    )
    .await;
    Ok(())
}

/// Parse `respond_<notification_id>_<index|other>`. The selector never
/// contains underscores, so splitting on the last one is unambiguous.
fn parse_action_id(action_id: &str) -> Option<(&str, &str)> {
    action_id.strip_prefix("respond_")?.rsplit_once('_')
}

fn truncate_for_update(text: &str) -> String {
    if text.chars().count() > 100 {
        let head: String = text.chars().take(97).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

/// POST /webhooks/slack/interactions
pub async fn handle_interactions(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if !verify(&state, &headers, &body) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let payload = match serde_urlencoded::from_str::<InteractionForm>(&body) {
        Ok(form) => form.payload,
        Err(e) => {
            warn!(error = %e, "malformed slack interaction form");
            return ack();
        }
    };
    let payload: InteractionPayload = match serde_json::from_str(&payload) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "malformed slack interaction payload");
            return ack();
        }
    };

    match payload.kind.as_str() {
        "block_actions" => {
            if let Err(e) = handle_block_action(&state, &payload).await {
                error!(error = %e, "slack block action handling failed");
            }
            ack()
        }
        "view_submission" => match handle_view_submission(&state, &payload).await {
            Ok(responded) if responded => {
                // Close the modal.
                Json(json!({ "response_action": "clear" })).into_response()
            }
            Ok(_) => ack(),
            Err(e) => {
                error!(error = %e, "slack view submission handling failed");
                ack()
            }
        },
        _ => ack(),
    }
}

async fn handle_block_action(
    state: &GatewayState,
    payload: &InteractionPayload,
) -> Result<(), DutylineError> {
    let Some(action) = payload.actions.as_ref().and_then(|a| a.first()) else {
        return Ok(());
    };
    let Some((notification_id, selector)) = parse_action_id(&action.action_id) else {
        return Ok(());
    };

    let Some(notification) = notifications::get_notification(&state.db, notification_id).await?
    else {
        return Ok(());
    };
    let Some(user) = users::get_user_by_slack_id(&state.db, &payload.user.id).await? else {
        return Ok(());
    };

    // "Other..." opens the free-text modal instead of recording.
    if selector == "other" {
        if let (Some(trigger_id), Some(chat)) = (payload.trigger_id.as_deref(), state.chat()) {
            let metadata = ModalMetadata {
                notification_id: notification.id.clone(),
                short_code: notification.short_code.clone(),
                message: notification.message.clone(),
                channel_id: payload.container.as_ref().and_then(|c| c.channel_id.clone()),
                message_ts: payload.container.as_ref().and_then(|c| c.message_ts.clone()),
            };
            let metadata = serde_json::to_string(&metadata).map_err(DutylineError::storage)?;
            if let Err(e) = chat
                .open_response_modal(
                    trigger_id,
                    &metadata,
                    &notification.short_code,
                    &notification.message,
                )
                .await
            {
                warn!(error = %e, "failed to open response modal");
            }
        }
        return Ok(());
    }

    let Some(selected) = action.value.as_deref() else {
        return Ok(());
    };

    record::record_response(
        &state.db,
        &notification,
        &user.id,
        Channel::Slack,
        None,
        Some(selected),
        None,
    )
    .await?;

    // Show the selection on the original message; best effort.
    if let (Some(container), Some(chat)) = (payload.container.as_ref(), state.chat())
        && let (Some(channel_id), Some(message_ts)) =
            (container.channel_id.as_deref(), container.message_ts.as_deref())
        && let Err(e) = chat
            .update_notification(
                channel_id,
                message_ts,
                &notification.short_code,
                &notification.message,
                selected,
            )
            .await
    {
        warn!(error = %e, "failed to update slack message");
    }
    Ok(())
}

/// Returns whether a response was recorded (and the modal should close).
async fn handle_view_submission(
    state: &GatewayState,
    payload: &InteractionPayload,
) -> Result<bool, DutylineError> {
    let Some(view) = payload.view.as_ref() else {
        return Ok(false);
    };
    if view.callback_id != "respond_modal" {
        return Ok(false);
    }

    let metadata: ModalMetadata = match serde_json::from_str(&view.private_metadata) {
        Ok(metadata) => metadata,
        Err(e) => {
            warn!(error = %e, "unreadable modal metadata");
            return Ok(false);
        }
    };
    let Some(text) = view
        .state
        .values
        .get("response_block")
        .and_then(|block| block.get("response_text"))
        .and_then(|input| input.value.as_deref())
    else {
        return Ok(false);
    };

    let Some(notification) =
        notifications::get_notification(&state.db, &metadata.notification_id).await?
    else {
        return Ok(false);
    };
    let Some(user) = users::get_user_by_slack_id(&state.db, &payload.user.id).await? else {
        return Ok(false);
    };

    record::record_response(
        &state.db,
        &notification,
        &user.id,
        Channel::Slack,
        Some(text),
        None,
        None,
    )
    .await?;

    // Replace the buttons on the original message with the custom answer.
    if let (Some(channel_id), Some(message_ts), Some(chat)) = (
        metadata.channel_id.as_deref(),
        metadata.message_ts.as_deref(),
        state.chat(),
    ) {
        let chosen = format!("Other: {}", truncate_for_update(text));
        if let Err(e) = chat
            .update_notification(
                channel_id,
                message_ts,
                &metadata.short_code,
                &metadata.message,
                &chosen,
            )
            .await
        {
            warn!(error = %e, "failed to update slack message");
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_id_parsing_handles_uuid_ids() {
        assert_eq!(
            parse_action_id("respond_550e8400-e29b-41d4-a716-446655440000_2"),
            Some(("550e8400-e29b-41d4-a716-446655440000", "2"))
        );
        assert_eq!(parse_action_id("respond_n-1_other"), Some(("n-1", "other")));
        assert_eq!(parse_action_id("something_else"), None);
    }

    #[test]
    fn link_code_extraction_is_case_insensitive_and_strict() {
        assert_eq!(
            extract_link_code("link-a1b2c3"),
            Some("LINK-A1B2C3".to_string())
        );
        assert_eq!(
            extract_link_code(" LINK-ZZZZZZ "),
            Some("LINK-ZZZZZZ".to_string())
        );
        assert_eq!(extract_link_code("LINK-SHORT"), None);
        assert_eq!(extract_link_code("LINK-TOOLONG1"), None);
        assert_eq!(extract_link_code("ABC ship it"), None);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let long = "x".repeat(150);
        let truncated = truncate_for_update(&long);
        assert_eq!(truncated.chars().count(), 100);
        assert!(truncated.ends_with("..."));

        assert_eq!(truncate_for_update("short"), "short");
    }
}
