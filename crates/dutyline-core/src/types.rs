// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types shared across the Dutyline workspace.
//!
//! Timestamps are RFC 3339 UTC strings (`%Y-%m-%dT%H:%M:%fZ`), generated by
//! SQLite's `strftime` in the storage layer. List-valued and blob-valued
//! columns (`tags`, `options`, `context`, delivery `metadata`) are JSON text.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Delivery channel for outbound notifications and inbound replies.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Slack,
    Sms,
}

/// Lifecycle status of a notification.
///
/// `pending -> delivered -> responded` is the canonical path. `archived` is a
/// terminal, user-initiated state. `expired` exists for API filtering parity;
/// nothing transitions into it automatically.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Pending,
    Delivered,
    Responded,
    Expired,
    Archived,
}

impl NotificationStatus {
    /// A notification is active while it still awaits a human reply.
    ///
    /// Short-code uniqueness and inbound reply lookups are scoped to active
    /// notifications only.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            NotificationStatus::Pending | NotificationStatus::Delivered
        )
    }
}

/// Outcome of a single channel delivery attempt.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

/// Status of a durable escalation job.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EscalationJobStatus {
    Pending,
    Done,
    Cancelled,
}

/// A person who answers decision requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    /// E.164 phone number for the SMS channel.
    pub phone: Option<String>,
    /// Slack member id (`U...`) once the account is linked.
    pub slack_user_id: Option<String>,
    pub slack_team_id: Option<String>,
    /// One-time `LINK-XXXXXX` code awaiting a Slack DM, if any.
    pub slack_link_code: Option<String>,
    pub slack_link_code_expires_at: Option<String>,
    pub timezone: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Groups notifications from one continuous agent run.
///
/// Once the first Slack delivery for a session establishes a thread, the
/// channel id and thread timestamp are persisted here so follow-up
/// notifications post into the same thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSession {
    pub id: String,
    pub user_id: String,
    pub session_key: String,
    pub workspace: Option<String>,
    pub slack_channel_id: Option<String>,
    pub slack_thread_ts: Option<String>,
    pub created_at: String,
}

/// A unit of human-decision work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    /// 3-character human-typeable code, unique among active notifications.
    pub short_code: String,
    pub user_id: String,
    pub session_id: Option<String>,
    pub message: String,
    pub priority: i64,
    /// Opaque context blob supplied by the agent.
    pub context: Option<serde_json::Value>,
    pub tags: Vec<String>,
    /// Ordered suggested answers; empty when the request is freeform-only.
    pub options: Vec<String>,
    pub status: NotificationStatus,
    /// Escalation is suspended until this instant without changing status.
    pub snoozed_until: Option<String>,
    pub current_escalation_step: i64,
    pub policy_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// One outbound send attempt on one channel for one notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub id: String,
    pub notification_id: String,
    pub channel: Channel,
    pub status: DeliveryStatus,
    /// Slack message `ts` or Twilio message SID, used for thread correlation.
    pub external_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub error: Option<String>,
    pub created_at: String,
}

/// One recorded human reply tied to a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub id: String,
    pub notification_id: String,
    pub channel: Channel,
    pub text: Option<String>,
    pub selected_option: Option<String>,
    pub external_id: Option<String>,
    pub responder_id: String,
    pub created_at: String,
}

/// An ordered sequence of timed channel attempts, scoped to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationPolicy {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub is_default: bool,
    pub created_at: String,
}

/// One step of an escalation policy: a channel plus a delay before it fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationStep {
    pub id: String,
    pub policy_id: String,
    pub step_order: i64,
    pub channel: Channel,
    pub delay_seconds: i64,
}

/// Maps a notification priority to an escalation policy for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityRoute {
    pub id: String,
    pub user_id: String,
    pub priority: i64,
    pub policy_id: String,
}

/// Persisted timer row driving the escalation scheduler for one notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationJob {
    pub notification_id: String,
    pub policy_id: Option<String>,
    /// Index of the next step to execute.
    pub next_step: i64,
    pub due_at: String,
    pub status: EscalationJobStatus,
    pub created_at: String,
    pub updated_at: String,
}
