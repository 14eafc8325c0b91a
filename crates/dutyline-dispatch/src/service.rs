// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification lifecycle operations driven by the REST API and CLI:
//! creation (with session grouping and policy routing), direct responses,
//! archive, snooze, and Slack link codes.

use dutyline_core::{
    Channel, ChatTransport, DutylineError, Notification, SmsTransport,
};
use dutyline_storage::queries::{jobs, notifications, policies, sessions, users};
use dutyline_storage::Database;
use rand::Rng;
use tracing::warn;

use crate::deliver;
use crate::record;
use crate::shortcode;

/// Slack link codes expire after 15 minutes.
const LINK_CODE_TTL_SECS: i64 = 900;

/// Input for [`create_notification`].
#[derive(Debug, Clone, Default)]
pub struct CreateNotification {
    pub message: String,
    pub priority: Option<i64>,
    pub options: Vec<String>,
    pub tags: Vec<String>,
    pub context: Option<serde_json::Value>,
    pub session_key: Option<String>,
    pub workspace: Option<String>,
}

/// Create a notification, deliver it, and start escalation.
///
/// Steps: allocate a short code, find-or-create the session when a session
/// key is given, route priority to an escalation policy (explicit route,
/// else the user's default), insert, deliver over every available channel,
/// and enqueue the escalation job. Escalation enqueue failure is logged and
/// swallowed -- the notification is already persisted and delivered.
pub async fn create_notification(
    db: &Database,
    chat: Option<&dyn ChatTransport>,
    sms: Option<&dyn SmsTransport>,
    user_id: &str,
    request: CreateNotification,
) -> Result<Notification, DutylineError> {
    let priority = request.priority.unwrap_or(3);
    let short_code = shortcode::allocate_code(db).await?;

    let session_id = match request.session_key.as_deref() {
        Some(session_key) => {
            let existing = sessions::find_session_by_key(db, user_id, session_key).await?;
            let session = match existing {
                Some(session) => session,
                None => {
                    sessions::create_session(db, user_id, session_key, request.workspace.as_deref())
                        .await?
                }
            };
            Some(session.id)
        }
        None => None,
    };

    let policy_id = match policies::route_for_priority(db, user_id, priority).await? {
        Some(route) => Some(route.policy_id),
        None => policies::default_policy_for_user(db, user_id)
            .await?
            .map(|policy| policy.id),
    };

    let notification = notifications::create_notification(
        db,
        notifications::NewNotification {
            short_code,
            user_id: user_id.to_string(),
            session_id,
            message: request.message,
            priority,
            context: request.context,
            tags: request.tags,
            options: request.options,
            policy_id: policy_id.clone(),
        },
    )
    .await?;

    deliver::deliver_notification(db, chat, sms, &notification.id).await?;

    // Step 0 of the escalation sequence is due immediately.
    if let Err(e) = jobs::enqueue_job(db, &notification.id, policy_id.as_deref(), 0).await {
        warn!(notification = %notification.id, error = %e, "failed to enqueue escalation");
    }

    // Re-fetch to pick up the delivered status.
    Ok(notifications::get_notification(db, &notification.id)
        .await?
        .unwrap_or(notification))
}

/// Record a response through the API, addressed by id or short code.
///
/// Returns `None` when the notification does not exist or is not owned by
/// the caller.
pub async fn respond_to_notification(
    db: &Database,
    user_id: &str,
    id_or_code: &str,
    text: Option<&str>,
    selected_option: Option<&str>,
) -> Result<Option<Notification>, DutylineError> {
    let Some(notification) = notifications::find_by_id_or_short_code(db, id_or_code, user_id).await?
    else {
        return Ok(None);
    };

    record::record_response(
        db,
        &notification,
        user_id,
        Channel::Slack,
        text,
        selected_option,
        None,
    )
    .await?;

    notifications::get_notification(db, &notification.id).await
}

/// Archive a notification (terminal, user-initiated) and cancel escalation.
pub async fn archive_notification(
    db: &Database,
    user_id: &str,
    id_or_code: &str,
) -> Result<Option<Notification>, DutylineError> {
    let Some(notification) = notifications::find_by_id_or_short_code(db, id_or_code, user_id).await?
    else {
        return Ok(None);
    };

    notifications::set_status(db, &notification.id, dutyline_core::NotificationStatus::Archived)
        .await?;
    if let Err(e) = jobs::cancel_job(db, &notification.id).await {
        warn!(notification = %notification.id, error = %e, "escalation cancellation failed");
    }

    notifications::get_notification(db, &notification.id).await
}

/// Snooze a notification for `seconds`: escalation is deferred without
/// changing status or step index.
pub async fn snooze_notification(
    db: &Database,
    user_id: &str,
    id_or_code: &str,
    seconds: i64,
) -> Result<Option<Notification>, DutylineError> {
    let Some(notification) = notifications::find_by_id_or_short_code(db, id_or_code, user_id).await?
    else {
        return Ok(None);
    };

    notifications::set_snoozed_until(db, &notification.id, seconds).await?;
    let updated = notifications::get_notification(db, &notification.id).await?;

    if let Some(updated) = &updated
        && let Some(until) = updated.snoozed_until.as_deref()
    {
        jobs::defer_job(db, &notification.id, until).await?;
    }

    Ok(updated)
}

/// Generate a one-time Slack link code for a user (`LINK-XXXXXX`).
pub async fn generate_link_code(db: &Database, user_id: &str) -> Result<String, DutylineError> {
    let Some(user) = users::get_user(db, user_id).await? else {
        return Err(DutylineError::NotFound {
            entity: "user",
            id: user_id.to_string(),
        });
    };

    let suffix: String = {
        let mut rng = rand::thread_rng();
        (0..6)
            .map(|_| {
                const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
                ALPHABET[rng.gen_range(0..ALPHABET.len())] as char
            })
            .collect()
    };
    let code = format!("LINK-{suffix}");

    users::set_slack_link_code(db, &user.id, &code, LINK_CODE_TTL_SECS).await?;
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dutyline_core::{EscalationJobStatus, NotificationStatus};
    use dutyline_storage::queries::responses;
    use dutyline_test_utils::TestHarness;

    fn request(message: &str) -> CreateNotification {
        CreateNotification {
            message: message.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_delivers_and_enqueues_escalation() {
        let h = TestHarness::new().await;
        let user = h.user_with_slack("dev@example.com", "U123").await;

        let n = create_notification(
            &h.db,
            Some(h.chat.as_ref()),
            Some(h.sms.as_ref()),
            &user.id,
            request("Deploy?"),
        )
        .await
        .unwrap();

        assert_eq!(n.status, NotificationStatus::Delivered);
        assert_eq!(n.short_code.len(), 3);
        assert_eq!(h.chat.posts().await.len(), 1);

        let job = jobs::get_job(&h.db, &n.id).await.unwrap().unwrap();
        assert_eq!(job.status, EscalationJobStatus::Pending);
        assert_eq!(job.next_step, 0);
        assert!(job.policy_id.is_none());
    }

    #[tokio::test]
    async fn create_routes_priority_to_policy() {
        let h = TestHarness::new().await;
        let user = h.user_with_slack("dev@example.com", "U123").await;

        let default_policy =
            policies::create_policy(&h.db, &user.id, "default", true).await.unwrap();
        let urgent_policy =
            policies::create_policy(&h.db, &user.id, "urgent", false).await.unwrap();
        policies::create_priority_route(&h.db, &user.id, 1, &urgent_policy.id)
            .await
            .unwrap();

        let mut urgent_request = request("Prod is down");
        urgent_request.priority = Some(1);
        let urgent = create_notification(&h.db, Some(h.chat.as_ref()), None, &user.id, urgent_request)
            .await
            .unwrap();
        assert_eq!(urgent.policy_id.as_deref(), Some(urgent_policy.id.as_str()));

        // Unrouted priority falls back to the default policy.
        let routine = create_notification(&h.db, Some(h.chat.as_ref()), None, &user.id, request("FYI"))
            .await
            .unwrap();
        assert_eq!(routine.policy_id.as_deref(), Some(default_policy.id.as_str()));
    }

    #[tokio::test]
    async fn create_groups_by_session_key() {
        let h = TestHarness::new().await;
        let user = h.user_with_slack("dev@example.com", "U123").await;

        let mut first_request = request("first");
        first_request.session_key = Some("run-1".to_string());
        first_request.workspace = Some("api-repo".to_string());
        let first = create_notification(&h.db, Some(h.chat.as_ref()), None, &user.id, first_request)
            .await
            .unwrap();

        let mut second_request = request("second");
        second_request.session_key = Some("run-1".to_string());
        let second =
            create_notification(&h.db, Some(h.chat.as_ref()), None, &user.id, second_request)
                .await
                .unwrap();

        assert_eq!(first.session_id, second.session_id);
        // One header, two threaded notification messages.
        assert_eq!(h.chat.texts().await.len(), 1);
        assert_eq!(h.chat.posts().await.len(), 2);
    }

    #[tokio::test]
    async fn respond_by_short_code_records_and_cancels() {
        let h = TestHarness::new().await;
        let user = h.user_with_slack("dev@example.com", "U123").await;
        let n = create_notification(&h.db, Some(h.chat.as_ref()), None, &user.id, request("Deploy?"))
            .await
            .unwrap();

        let updated = respond_to_notification(&h.db, &user.id, &n.short_code, Some("ship it"), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, NotificationStatus::Responded);

        let rows = responses::list_for_notification(&h.db, &n.id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].text.as_deref(), Some("ship it"));

        let job = jobs::get_job(&h.db, &n.id).await.unwrap().unwrap();
        assert_eq!(job.status, EscalationJobStatus::Cancelled);
    }

    #[tokio::test]
    async fn respond_to_unknown_id_is_none() {
        let h = TestHarness::new().await;
        let user = h.user("dev@example.com").await;
        assert!(respond_to_notification(&h.db, &user.id, "ZZZ", Some("hi"), None)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn archive_is_terminal_and_cancels_escalation() {
        let h = TestHarness::new().await;
        let user = h.user_with_slack("dev@example.com", "U123").await;
        let n = create_notification(&h.db, Some(h.chat.as_ref()), None, &user.id, request("Deploy?"))
            .await
            .unwrap();

        let archived = archive_notification(&h.db, &user.id, &n.id).await.unwrap().unwrap();
        assert_eq!(archived.status, NotificationStatus::Archived);

        let job = jobs::get_job(&h.db, &n.id).await.unwrap().unwrap();
        assert_eq!(job.status, EscalationJobStatus::Cancelled);

        // The archived notification's code no longer resolves.
        assert!(notifications::find_active_by_short_code(&h.db, &n.short_code, &user.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn snooze_defers_the_job_without_touching_status() {
        let h = TestHarness::new().await;
        let user = h.user_with_slack("dev@example.com", "U123").await;
        let n = create_notification(&h.db, Some(h.chat.as_ref()), None, &user.id, request("Deploy?"))
            .await
            .unwrap();

        let snoozed = snooze_notification(&h.db, &user.id, &n.id, 3600).await.unwrap().unwrap();
        assert_eq!(snoozed.status, NotificationStatus::Delivered);
        assert!(snoozed.snoozed_until.is_some());

        // The job is no longer due.
        assert!(jobs::claim_due_job(&h.db, 300).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn link_code_has_expected_shape() {
        let h = TestHarness::new().await;
        let user = h.user("dev@example.com").await;
        let code = generate_link_code(&h.db, &user.id).await.unwrap();
        assert!(code.starts_with("LINK-"));
        assert_eq!(code.len(), 11);

        let found = users::find_user_by_link_code(&h.db, &code).await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
    }
}
