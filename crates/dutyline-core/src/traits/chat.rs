// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Threaded chat transport trait (implemented by the Slack crate).

use async_trait::async_trait;

use crate::error::DutylineError;

/// Identifiers of a message the transport has posted.
///
/// `ts` is the external message identifier used later for thread correlation;
/// `channel_id` is the physical room the message landed in (for Slack DMs
/// this differs from the member id the message was addressed to).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub ts: String,
    pub channel_id: String,
}

/// A notification to render and post on the chat channel.
#[derive(Debug, Clone)]
pub struct ChatPost<'a> {
    /// Member id or channel id to address.
    pub target: &'a str,
    pub short_code: &'a str,
    pub message: &'a str,
    /// Suggested answers, rendered as buttons plus an "Other..." escape hatch.
    pub options: &'a [String],
    /// Embedded in button action ids so interaction callbacks can address
    /// the notification directly.
    pub notification_id: &'a str,
    /// Post into an existing thread instead of starting a new message.
    pub thread_ts: Option<&'a str>,
}

/// Transport for a threaded chat channel.
///
/// Implementations render domain content into the platform's message format;
/// callers never touch platform payloads directly.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Post a notification message, returning its identifiers.
    async fn post_notification(&self, post: ChatPost<'_>) -> Result<PostedMessage, DutylineError>;

    /// Post a plain text message (guidance replies, thread headers).
    async fn post_text(
        &self,
        target: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<PostedMessage, DutylineError>;

    /// Rewrite a previously posted notification message to show the chosen
    /// answer and drop its action buttons.
    async fn update_notification(
        &self,
        channel_id: &str,
        ts: &str,
        short_code: &str,
        message: &str,
        chosen: &str,
    ) -> Result<(), DutylineError>;

    /// Open the free-text response form for an options notification.
    ///
    /// `private_metadata` is an opaque blob echoed back verbatim in the form
    /// submission callback.
    async fn open_response_modal(
        &self,
        trigger_id: &str,
        private_metadata: &str,
        short_code: &str,
        message: &str,
    ) -> Result<(), DutylineError>;
}
