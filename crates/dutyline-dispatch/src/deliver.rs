// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery engine.
//!
//! First delivery tries every channel the user has: Slack and SMS are
//! independent attempts, and a failure on one never aborts the other. Slack
//! failures are recorded as failed deliveries for auditability; SMS failures
//! are swallowed entirely (the channel is best-effort, and a misconfigured
//! Twilio account must not pollute delivery history). The notification
//! transitions to `delivered` iff at least one channel send succeeded.
//!
//! Escalation steps reuse the single-channel attempts through
//! [`deliver_via_channel`] and [`deliver_preferred`].

use dutyline_core::{
    Channel, ChatPost, ChatTransport, DeliveryStatus, DutylineError, Notification, SmsTransport,
    User,
};
use dutyline_storage::queries::{deliveries, notifications, sessions, users};
use dutyline_storage::Database;
use serde_json::json;
use tracing::{debug, warn};

/// Compose the SMS body: short code, message, and reply instructions.
pub fn sms_body(short_code: &str, message: &str, options: &[String]) -> String {
    let mut body = format!("[{short_code}] {message}");
    if options.is_empty() {
        body.push_str(&format!("\n\nReply \"{short_code} <your response>\""));
    } else {
        body.push_str("\n\nReply with:");
        for (index, option) in options.iter().enumerate() {
            body.push_str(&format!("\n{}. {}", index + 1, option));
        }
        body.push_str(&format!("\n\nOr reply \"{short_code} <your response>\""));
    }
    body
}

fn session_header_text(session_key: &str, workspace: Option<&str>) -> String {
    match workspace {
        Some(workspace) => format!("Agent session `{session_key}` in {workspace}"),
        None => format!("Agent session `{session_key}`"),
    }
}

/// Resolve the Slack thread for a notification's session, creating the
/// header message on first use and persisting its identifiers.
async fn ensure_session_thread(
    db: &Database,
    chat: &dyn ChatTransport,
    session_id: &str,
    slack_target: &str,
) -> Result<Option<String>, DutylineError> {
    let Some(session) = sessions::get_session(db, session_id).await? else {
        return Ok(None);
    };
    if let Some(thread_ts) = session.slack_thread_ts {
        return Ok(Some(thread_ts));
    }

    let header = session_header_text(&session.session_key, session.workspace.as_deref());
    let posted = chat.post_text(slack_target, &header, None).await?;
    sessions::set_session_thread(db, &session.id, &posted.channel_id, &posted.ts).await?;
    debug!(session = %session.id, thread_ts = %posted.ts, "session thread established");
    Ok(Some(posted.ts))
}

async fn send_slack(
    db: &Database,
    chat: &dyn ChatTransport,
    notification: &Notification,
    slack_target: &str,
) -> Result<(dutyline_core::PostedMessage, Option<String>), DutylineError> {
    let thread_ts = match &notification.session_id {
        Some(session_id) => ensure_session_thread(db, chat, session_id, slack_target).await?,
        None => None,
    };

    let posted = chat
        .post_notification(ChatPost {
            target: slack_target,
            short_code: &notification.short_code,
            message: &notification.message,
            options: &notification.options,
            notification_id: &notification.id,
            thread_ts: thread_ts.as_deref(),
        })
        .await?;
    Ok((posted, thread_ts))
}

/// Attempt the Slack channel. Returns whether a message was sent.
///
/// A send failure is recorded as a failed delivery and reported as `false`,
/// never as an error: the caller always proceeds to the next channel.
pub async fn attempt_slack(
    db: &Database,
    chat: &dyn ChatTransport,
    notification: &Notification,
    user: &User,
) -> Result<bool, DutylineError> {
    let Some(slack_target) = user.slack_user_id.as_deref() else {
        return Ok(false);
    };

    match send_slack(db, chat, notification, slack_target).await {
        Ok((posted, thread_ts)) => {
            deliveries::record_delivery(
                db,
                &notification.id,
                Channel::Slack,
                DeliveryStatus::Sent,
                Some(&posted.ts),
                Some(json!({ "channel": posted.channel_id, "thread_ts": thread_ts })),
                None,
            )
            .await?;
            Ok(true)
        }
        Err(e) => {
            warn!(notification = %notification.id, error = %e, "slack delivery failed");
            deliveries::record_delivery(
                db,
                &notification.id,
                Channel::Slack,
                DeliveryStatus::Failed,
                None,
                None,
                Some(&e.to_string()),
            )
            .await?;
            Ok(false)
        }
    }
}

/// Attempt the SMS channel. Returns whether a message was sent.
///
/// SMS is optional: provider failures are swallowed without a delivery
/// record and reported as `false`.
pub async fn attempt_sms(
    db: &Database,
    sms: &dyn SmsTransport,
    notification: &Notification,
    user: &User,
) -> Result<bool, DutylineError> {
    let Some(phone) = user.phone.as_deref() else {
        return Ok(false);
    };

    let body = sms_body(
        &notification.short_code,
        &notification.message,
        &notification.options,
    );
    match sms.send(phone, &body).await {
        Ok(sid) => {
            deliveries::record_delivery(
                db,
                &notification.id,
                Channel::Sms,
                DeliveryStatus::Sent,
                Some(&sid),
                None,
                None,
            )
            .await?;
            Ok(true)
        }
        Err(e) => {
            debug!(notification = %notification.id, error = %e, "sms channel unavailable");
            Ok(false)
        }
    }
}

/// Deliver a notification via every channel the user has.
///
/// Missing notification or user is a silent no-op. Marks the notification
/// `delivered` when at least one channel attempt succeeded.
pub async fn deliver_notification(
    db: &Database,
    chat: Option<&dyn ChatTransport>,
    sms: Option<&dyn SmsTransport>,
    notification_id: &str,
) -> Result<(), DutylineError> {
    let Some(notification) = notifications::get_notification(db, notification_id).await? else {
        return Ok(());
    };
    let Some(user) = users::get_user(db, &notification.user_id).await? else {
        return Ok(());
    };

    let mut sent_any = false;
    if let Some(chat) = chat {
        sent_any |= attempt_slack(db, chat, &notification, &user).await?;
    }
    if let Some(sms) = sms {
        sent_any |= attempt_sms(db, sms, &notification, &user).await?;
    }

    if sent_any {
        notifications::set_status(db, &notification.id, dutyline_core::NotificationStatus::Delivered)
            .await?;
    }
    Ok(())
}

/// Deliver on exactly one channel (escalation steps). Returns whether a
/// message was sent; a step whose channel the user lacks is a no-op.
pub async fn deliver_via_channel(
    db: &Database,
    chat: Option<&dyn ChatTransport>,
    sms: Option<&dyn SmsTransport>,
    notification: &Notification,
    user: &User,
    channel: Channel,
) -> Result<bool, DutylineError> {
    match channel {
        Channel::Slack => match chat {
            Some(chat) => attempt_slack(db, chat, notification, user).await,
            None => Ok(false),
        },
        Channel::Sms => match sms {
            Some(sms) => attempt_sms(db, sms, notification, user).await,
            None => Ok(false),
        },
    }
}

/// One best-effort delivery on the user's preferred channel: Slack when
/// linked, else SMS. Used when a notification has no escalation policy.
pub async fn deliver_preferred(
    db: &Database,
    chat: Option<&dyn ChatTransport>,
    sms: Option<&dyn SmsTransport>,
    notification: &Notification,
    user: &User,
) -> Result<bool, DutylineError> {
    if user.slack_user_id.is_some()
        && let Some(chat) = chat
    {
        return attempt_slack(db, chat, notification, user).await;
    }
    if user.phone.is_some()
        && let Some(sms) = sms
    {
        return attempt_sms(db, sms, notification, user).await;
    }
    Ok(false)
}
