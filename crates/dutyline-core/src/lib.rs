// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Dutyline, a human-in-the-loop notification router.
//!
//! This crate provides the error type, domain model types, and the channel
//! transport traits used throughout the Dutyline workspace. Transport
//! implementations (Slack, Twilio SMS) and the persistence layer all build
//! on the definitions here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::DutylineError;
pub use traits::{ChatPost, ChatTransport, PostedMessage, SmsTransport};
pub use types::{
    AgentSession, Channel, Delivery, DeliveryStatus, EscalationJob, EscalationJobStatus,
    EscalationPolicy, EscalationStep, Notification, NotificationStatus, PriorityRoute,
    ResponseRecord, User,
};

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn channel_round_trips_through_display() {
        for channel in [Channel::Slack, Channel::Sms] {
            let s = channel.to_string();
            let parsed = Channel::from_str(&s).expect("should parse back");
            assert_eq!(channel, parsed);
        }
        assert_eq!(Channel::Slack.to_string(), "slack");
        assert_eq!(Channel::Sms.to_string(), "sms");
    }

    #[test]
    fn notification_status_is_lowercase_on_the_wire() {
        assert_eq!(NotificationStatus::Pending.to_string(), "pending");
        assert_eq!(NotificationStatus::Delivered.to_string(), "delivered");
        assert_eq!(NotificationStatus::Responded.to_string(), "responded");
        assert_eq!(NotificationStatus::Expired.to_string(), "expired");
        assert_eq!(NotificationStatus::Archived.to_string(), "archived");
    }

    #[test]
    fn active_statuses_exclude_terminal_states() {
        assert!(NotificationStatus::Pending.is_active());
        assert!(NotificationStatus::Delivered.is_active());
        assert!(!NotificationStatus::Responded.is_active());
        assert!(!NotificationStatus::Expired.is_active());
        assert!(!NotificationStatus::Archived.is_active());
    }

    #[test]
    fn dutyline_error_variants_construct() {
        let _config = DutylineError::Config("bad toml".into());
        let _storage = DutylineError::Storage {
            source: Box::new(std::io::Error::other("disk")),
        };
        let _channel = DutylineError::Channel {
            message: "slack 500".into(),
            source: None,
        };
        let _not_found = DutylineError::NotFound {
            entity: "notification",
            id: "abc".into(),
        };
        let _internal = DutylineError::Internal("unexpected".into());
    }
}
