// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Response recording.
//!
//! Every inbound reply that resolves to a notification lands here: one new
//! response row, an idempotent transition to `responded`, and a best-effort
//! cancellation of the escalation job. Cancellation failure is logged and
//! swallowed so the human-facing reply path never surfaces it.

use dutyline_core::{Channel, DutylineError, Notification};
use dutyline_storage::queries::{jobs, notifications, responses};
use dutyline_storage::Database;
use tracing::{debug, warn};

/// Record a human reply against a notification.
///
/// Appends a response row unconditionally -- repeated replies are preserved
/// as history -- and (re-)marks the notification `responded`. At least one
/// of `text` and `selected_option` should be present in practice.
pub async fn record_response(
    db: &Database,
    notification: &Notification,
    responder_id: &str,
    channel: Channel,
    text: Option<&str>,
    selected_option: Option<&str>,
    external_id: Option<&str>,
) -> Result<(), DutylineError> {
    responses::record_response(
        db,
        &notification.id,
        channel,
        text,
        selected_option,
        external_id,
        responder_id,
    )
    .await?;

    notifications::set_status(
        db,
        &notification.id,
        dutyline_core::NotificationStatus::Responded,
    )
    .await?;

    // Cancel escalation; failure here must never reach the reply path.
    match jobs::cancel_job(db, &notification.id).await {
        Ok(true) => debug!(notification = %notification.id, "escalation cancelled"),
        Ok(false) => {}
        Err(e) => {
            warn!(notification = %notification.id, error = %e, "escalation cancellation failed");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dutyline_core::{EscalationJobStatus, NotificationStatus};
    use dutyline_storage::queries::notifications::NewNotification;
    use dutyline_test_utils::TestHarness;

    async fn make_notification(h: &TestHarness, user_id: &str) -> Notification {
        notifications::create_notification(
            &h.db,
            NewNotification {
                short_code: "AB1".to_string(),
                user_id: user_id.to_string(),
                session_id: None,
                message: "Deploy?".to_string(),
                priority: 3,
                context: None,
                tags: vec![],
                options: vec!["Yes".into(), "No".into()],
                policy_id: None,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn records_row_marks_responded_and_cancels_job() {
        let h = TestHarness::new().await;
        let user = h.user("dev@example.com").await;
        let n = make_notification(&h, &user.id).await;
        jobs::enqueue_job(&h.db, &n.id, None, 0).await.unwrap();

        record_response(&h.db, &n, &user.id, Channel::Sms, None, Some("Yes"), Some("SM1"))
            .await
            .unwrap();

        let rows = responses::list_for_notification(&h.db, &n.id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].selected_option.as_deref(), Some("Yes"));
        assert_eq!(rows[0].channel, Channel::Sms);

        let updated = notifications::get_notification(&h.db, &n.id).await.unwrap().unwrap();
        assert_eq!(updated.status, NotificationStatus::Responded);

        let job = jobs::get_job(&h.db, &n.id).await.unwrap().unwrap();
        assert_eq!(job.status, EscalationJobStatus::Cancelled);
    }

    #[tokio::test]
    async fn double_record_keeps_history_and_status() {
        let h = TestHarness::new().await;
        let user = h.user("dev@example.com").await;
        let n = make_notification(&h, &user.id).await;

        record_response(&h.db, &n, &user.id, Channel::Slack, Some("first"), None, None)
            .await
            .unwrap();
        record_response(&h.db, &n, &user.id, Channel::Slack, Some("second"), None, None)
            .await
            .unwrap();

        let rows = responses::list_for_notification(&h.db, &n.id).await.unwrap();
        assert_eq!(rows.len(), 2);

        let updated = notifications::get_notification(&h.db, &n.id).await.unwrap().unwrap();
        assert_eq!(updated.status, NotificationStatus::Responded);
    }

    #[tokio::test]
    async fn stray_cancellation_is_harmless() {
        let h = TestHarness::new().await;
        let user = h.user("dev@example.com").await;
        let n = make_notification(&h, &user.id).await;

        // No escalation job was ever enqueued.
        record_response(&h.db, &n, &user.id, Channel::Slack, Some("ok"), None, None)
            .await
            .unwrap();
        assert!(jobs::get_job(&h.db, &n.id).await.unwrap().is_none());
    }
}
