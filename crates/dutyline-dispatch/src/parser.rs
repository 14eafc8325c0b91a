// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound message parsing.
//!
//! Turns raw reply text (SMS body or Slack DM) into a structured [`Intent`]
//! against the user's current notifications. Three patterns, in priority
//! order:
//!
//! 1. `"ABC response text"` -- short-code-addressed reply
//! 2. `"2"` -- 1-based option selection on the most recent delivered
//!    notification
//! 3. anything else -- freeform reply to the most recent delivered
//!    notification
//!
//! The short-code gate is case-sensitive (uppercase only) so ordinary words
//! like "did" or "the" never match; the captured code is uppercased before
//! lookup anyway to tolerate mixed-case input beyond the gate.

use std::sync::LazyLock;

use dutyline_core::{DutylineError, Notification};
use dutyline_storage::queries::notifications;
use dutyline_storage::Database;
use regex::Regex;

static SHORT_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z0-9]{3})\s+(.+)$").expect("static regex"));

static DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").expect("static regex"));

/// Structured interpretation of one inbound reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Reply addressed to a specific notification by short code.
    ShortCodeReply {
        notification: Notification,
        text: String,
    },
    /// Numeric selection of a suggested answer.
    OptionSelected {
        notification: Notification,
        option: String,
    },
    /// Freeform reply to the most recent delivered notification.
    FreeformReply {
        notification: Notification,
        text: String,
    },
    /// Numeric reply out of range (or the target has no options).
    InvalidOption,
    /// Short code matched the pattern but no active notification carries it.
    NotFound { short_code: String },
    /// Nothing to attach the reply to.
    NoActiveTarget,
}

/// Match the short-code pattern, returning `(code, remainder)`.
///
/// Anchored whole-string match, not a search; multi-line text falls through
/// to freeform because `.` does not cross newlines.
pub fn match_short_code(text: &str) -> Option<(&str, &str)> {
    SHORT_CODE_RE
        .captures(text)
        .map(|c| (c.get(1).expect("group 1").as_str(), c.get(2).expect("group 2").as_str()))
}

/// Whether the text is purely digits (an option selection).
pub fn is_option_selection(text: &str) -> bool {
    DIGITS_RE.is_match(text)
}

/// Parse an inbound message into an [`Intent`] for `user_id`.
///
/// Read-only: queries notification state but never mutates it.
pub async fn parse_inbound(
    db: &Database,
    text: &str,
    user_id: &str,
) -> Result<Intent, DutylineError> {
    let text = text.trim();

    // Pattern 1: short code prefix, e.g. "ABC some response".
    if let Some((code, remainder)) = match_short_code(text) {
        let code = code.to_uppercase();
        let Some(notification) =
            notifications::find_active_by_short_code(db, &code, user_id).await?
        else {
            return Ok(Intent::NotFound { short_code: code });
        };
        return Ok(Intent::ShortCodeReply {
            notification,
            text: remainder.to_string(),
        });
    }

    // Pattern 2: number selection against the newest delivered notification.
    if is_option_selection(text) {
        let Some(notification) = notifications::latest_delivered_for_user(db, user_id).await?
        else {
            return Ok(Intent::NoActiveTarget);
        };
        let index = match text.parse::<usize>() {
            Ok(n) if n >= 1 && n <= notification.options.len() => n - 1,
            // Out of range, zero, or unparseably large -- all invalid.
            _ => return Ok(Intent::InvalidOption),
        };
        let option = notification.options[index].clone();
        return Ok(Intent::OptionSelected {
            notification,
            option,
        });
    }

    // Pattern 3: freeform text to the newest delivered notification.
    match notifications::latest_delivered_for_user(db, user_id).await? {
        Some(notification) => Ok(Intent::FreeformReply {
            notification,
            text: text.to_string(),
        }),
        None => Ok(Intent::NoActiveTarget),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dutyline_core::NotificationStatus;
    use dutyline_storage::queries::notifications::{set_status, NewNotification};
    use dutyline_test_utils::TestHarness;
    use proptest::prelude::*;

    fn new_notification(user_id: &str, code: &str, options: Vec<String>) -> NewNotification {
        NewNotification {
            short_code: code.to_string(),
            user_id: user_id.to_string(),
            session_id: None,
            message: "Deploy to prod?".to_string(),
            priority: 3,
            context: None,
            tags: vec![],
            options,
            policy_id: None,
        }
    }

    #[test]
    fn short_code_gate_is_case_sensitive() {
        assert_eq!(match_short_code("ABC ship it"), Some(("ABC", "ship it")));
        assert_eq!(match_short_code("A1Z yes"), Some(("A1Z", "yes")));
        // Ordinary lowercase words never match the gate.
        assert_eq!(match_short_code("did you see this"), None);
        assert_eq!(match_short_code("abc ship it"), None);
        // Anchored: prefix only, no search.
        assert_eq!(match_short_code("reply ABC ship it"), None);
        // Code alone without content is not a short-code reply.
        assert_eq!(match_short_code("ABC"), None);
        assert_eq!(match_short_code("ABC "), None);
    }

    proptest! {
        /// For all valid 3-char uppercase-alphanumeric codes followed by
        /// whitespace and content, the gate extracts exactly the code and
        /// remainder.
        #[test]
        fn gate_extracts_code_and_remainder(
            code in "[A-Z0-9]{3}",
            sep in "[ \t]{1,3}",
            // Must not start with whitespace: the separator is greedy.
            body in "[a-zA-Z0-9][a-zA-Z0-9 ,.!?]{0,39}",
        ) {
            let input = format!("{code}{sep}{body}");
            let (got_code, got_body) = match_short_code(&input).expect("must match");
            prop_assert_eq!(got_code, code.as_str());
            prop_assert_eq!(got_body, body.as_str());
        }

        /// Digit-only strings are option selections; anything else is not.
        #[test]
        fn digits_gate(input in "[0-9]{1,8}") {
            prop_assert!(is_option_selection(&input));
        }
    }

    #[tokio::test]
    async fn short_code_reply_resolves_active_notification() {
        let h = TestHarness::new().await;
        let user = h.user("dev@example.com").await;
        let n = notifications::create_notification(&h.db, new_notification(&user.id, "XY7", vec![]))
            .await
            .unwrap();

        let intent = parse_inbound(&h.db, "XY7 go ahead", &user.id).await.unwrap();
        match intent {
            Intent::ShortCodeReply { notification, text } => {
                assert_eq!(notification.id, n.id);
                assert_eq!(text, "go ahead");
            }
            other => panic!("unexpected intent: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_short_code_is_not_found() {
        let h = TestHarness::new().await;
        let user = h.user("dev@example.com").await;

        let intent = parse_inbound(&h.db, "XYZ anything", &user.id).await.unwrap();
        assert_eq!(
            intent,
            Intent::NotFound {
                short_code: "XYZ".to_string()
            }
        );
    }

    #[tokio::test]
    async fn short_code_of_terminal_notification_is_not_found() {
        let h = TestHarness::new().await;
        let user = h.user("dev@example.com").await;
        let n = notifications::create_notification(&h.db, new_notification(&user.id, "XY7", vec![]))
            .await
            .unwrap();
        set_status(&h.db, &n.id, NotificationStatus::Responded).await.unwrap();

        let intent = parse_inbound(&h.db, "XY7 too late", &user.id).await.unwrap();
        assert_eq!(
            intent,
            Intent::NotFound {
                short_code: "XY7".to_string()
            }
        );
    }

    #[tokio::test]
    async fn numeric_selection_round_trip() {
        let h = TestHarness::new().await;
        let user = h.user("dev@example.com").await;
        let n = notifications::create_notification(
            &h.db,
            new_notification(
                &user.id,
                "AB1",
                vec!["Revert".into(), "Fix".into(), "Skip".into()],
            ),
        )
        .await
        .unwrap();
        set_status(&h.db, &n.id, NotificationStatus::Delivered).await.unwrap();

        let intent = parse_inbound(&h.db, "2", &user.id).await.unwrap();
        match intent {
            Intent::OptionSelected { notification, option } => {
                assert_eq!(notification.id, n.id);
                assert_eq!(option, "Fix");
            }
            other => panic!("unexpected intent: {other:?}"),
        }
    }

    #[tokio::test]
    async fn out_of_range_selection_is_invalid_option() {
        let h = TestHarness::new().await;
        let user = h.user("dev@example.com").await;
        let n = notifications::create_notification(
            &h.db,
            new_notification(&user.id, "AB1", vec!["Yes".into(), "No".into()]),
        )
        .await
        .unwrap();
        set_status(&h.db, &n.id, NotificationStatus::Delivered).await.unwrap();

        assert_eq!(parse_inbound(&h.db, "0", &user.id).await.unwrap(), Intent::InvalidOption);
        assert_eq!(parse_inbound(&h.db, "3", &user.id).await.unwrap(), Intent::InvalidOption);
        // Overflow-sized numbers are invalid, not a crash.
        assert_eq!(
            parse_inbound(&h.db, "99999999999999999999999999", &user.id).await.unwrap(),
            Intent::InvalidOption
        );
    }

    #[tokio::test]
    async fn numeric_reply_against_optionless_notification_is_invalid() {
        let h = TestHarness::new().await;
        let user = h.user("dev@example.com").await;
        let n = notifications::create_notification(&h.db, new_notification(&user.id, "AB1", vec![]))
            .await
            .unwrap();
        set_status(&h.db, &n.id, NotificationStatus::Delivered).await.unwrap();

        assert_eq!(parse_inbound(&h.db, "1", &user.id).await.unwrap(), Intent::InvalidOption);
    }

    #[tokio::test]
    async fn numeric_reply_without_target_is_no_active() {
        let h = TestHarness::new().await;
        let user = h.user("dev@example.com").await;
        assert_eq!(parse_inbound(&h.db, "1", &user.id).await.unwrap(), Intent::NoActiveTarget);
    }

    #[tokio::test]
    async fn freeform_targets_most_recent_delivered() {
        let h = TestHarness::new().await;
        let user = h.user("dev@example.com").await;
        let older = notifications::create_notification(
            &h.db,
            new_notification(&user.id, "AA1", vec![]),
        )
        .await
        .unwrap();
        let newer = notifications::create_notification(
            &h.db,
            new_notification(&user.id, "BB2", vec![]),
        )
        .await
        .unwrap();
        set_status(&h.db, &older.id, NotificationStatus::Delivered).await.unwrap();
        set_status(&h.db, &newer.id, NotificationStatus::Delivered).await.unwrap();

        let intent = parse_inbound(&h.db, "looks good to me", &user.id).await.unwrap();
        match intent {
            Intent::FreeformReply { notification, text } => {
                assert_eq!(notification.id, newer.id);
                assert_eq!(text, "looks good to me");
            }
            other => panic!("unexpected intent: {other:?}"),
        }
    }

    #[tokio::test]
    async fn freeform_without_target_is_no_active() {
        let h = TestHarness::new().await;
        let user = h.user("dev@example.com").await;
        assert_eq!(
            parse_inbound(&h.db, "hello there", &user.id).await.unwrap(),
            Intent::NoActiveTarget
        );
    }

    #[tokio::test]
    async fn pending_notifications_are_not_freeform_targets() {
        let h = TestHarness::new().await;
        let user = h.user("dev@example.com").await;
        // Created but never delivered.
        notifications::create_notification(&h.db, new_notification(&user.id, "AA1", vec![]))
            .await
            .unwrap();
        assert_eq!(
            parse_inbound(&h.db, "hello", &user.id).await.unwrap(),
            Intent::NoActiveTarget
        );
    }
}
