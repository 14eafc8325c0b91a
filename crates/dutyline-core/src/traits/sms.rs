// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SMS transport trait (implemented by the Twilio crate).

use async_trait::async_trait;

use crate::error::DutylineError;

/// Transport for the numbered-SMS channel.
///
/// SMS is best-effort: callers treat a send error as "channel unavailable"
/// rather than a delivery failure.
#[async_trait]
pub trait SmsTransport: Send + Sync {
    /// Send a message body to an E.164 number, returning the provider's
    /// message identifier.
    async fn send(&self, to: &str, body: &str) -> Result<String, DutylineError>;
}
