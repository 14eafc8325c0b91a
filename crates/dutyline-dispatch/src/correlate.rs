// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Thread reply correlation.
//!
//! Maps a reply inside a Slack thread back to the notification that opened
//! it. Two lookups: the thread root may be a delivery's own message
//! (reply-to-the-exact-message), or the session header message whose thread
//! all of a session's notifications post into. Every miss is a silent
//! `None` -- unknown senders learn nothing about what exists.

use dutyline_core::{Channel, DutylineError, Notification, User};
use dutyline_storage::queries::{deliveries, notifications, sessions, users};
use dutyline_storage::Database;
use tracing::debug;

/// Resolve a Slack thread reply to its target notification and the replying
/// user.
pub async fn resolve_thread_reply(
    db: &Database,
    slack_user_id: &str,
    thread_ts: &str,
) -> Result<Option<(Notification, User)>, DutylineError> {
    let Some(user) = users::get_user_by_slack_id(db, slack_user_id).await? else {
        debug!("thread reply from unlinked slack account; ignoring");
        return Ok(None);
    };

    // First try: the thread root is a delivered notification message.
    if let Some(delivery) = deliveries::find_by_external_id(db, thread_ts, Channel::Slack).await?
        && let Some(notification) =
            notifications::get_notification(db, &delivery.notification_id).await?
    {
        return Ok(Some((notification, user)));
    }

    // Fallback: the thread root is a session header; target the session's
    // newest notification owned by the replying user.
    if let Some(session) = sessions::find_session_by_thread(db, thread_ts).await?
        && let Some(notification) =
            notifications::latest_in_session_for_user(db, &session.id, &user.id).await?
    {
        return Ok(Some((notification, user)));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dutyline_core::DeliveryStatus;
    use dutyline_storage::queries::notifications::NewNotification;
    use dutyline_test_utils::TestHarness;

    async fn make_notification(
        h: &TestHarness,
        user_id: &str,
        code: &str,
        session_id: Option<String>,
    ) -> Notification {
        notifications::create_notification(
            &h.db,
            NewNotification {
                short_code: code.to_string(),
                user_id: user_id.to_string(),
                session_id,
                message: "msg".to_string(),
                priority: 3,
                context: None,
                tags: vec![],
                options: vec![],
                policy_id: None,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn resolves_via_delivery_external_id() {
        let h = TestHarness::new().await;
        let user = h.user_with_slack("dev@example.com", "U123").await;
        let n = make_notification(&h, &user.id, "AB1", None).await;
        deliveries::record_delivery(
            &h.db,
            &n.id,
            Channel::Slack,
            DeliveryStatus::Sent,
            Some("1719.0001"),
            None,
            None,
        )
        .await
        .unwrap();

        let (found, responder) = resolve_thread_reply(&h.db, "U123", "1719.0001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, n.id);
        assert_eq!(responder.id, user.id);
    }

    #[tokio::test]
    async fn falls_back_to_session_thread() {
        let h = TestHarness::new().await;
        let user = h.user_with_slack("dev@example.com", "U123").await;
        let session = sessions::create_session(&h.db, &user.id, "run-1", None)
            .await
            .unwrap();
        sessions::set_session_thread(&h.db, &session.id, "D042", "1719.0099")
            .await
            .unwrap();

        let _older = make_notification(&h, &user.id, "AA1", Some(session.id.clone())).await;
        let newer = make_notification(&h, &user.id, "BB2", Some(session.id.clone())).await;

        // The thread root matches no delivery, only the session header.
        let (found, _) = resolve_thread_reply(&h.db, "U123", "1719.0099")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, newer.id);
    }

    #[tokio::test]
    async fn unknown_sender_is_silently_ignored() {
        let h = TestHarness::new().await;
        let user = h.user_with_slack("dev@example.com", "U123").await;
        let n = make_notification(&h, &user.id, "AB1", None).await;
        deliveries::record_delivery(
            &h.db,
            &n.id,
            Channel::Slack,
            DeliveryStatus::Sent,
            Some("1719.0001"),
            None,
            None,
        )
        .await
        .unwrap();

        assert!(resolve_thread_reply(&h.db, "U-STRANGER", "1719.0001")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn unknown_thread_is_silently_ignored() {
        let h = TestHarness::new().await;
        h.user_with_slack("dev@example.com", "U123").await;
        assert!(resolve_thread_reply(&h.db, "U123", "1719.9999")
            .await
            .unwrap()
            .is_none());
    }
}
