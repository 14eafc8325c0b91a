// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification dispatch core: inbound reply parsing, thread correlation,
//! channel delivery, and response recording.
//!
//! This crate holds the channel-agnostic logic between the webhook surface
//! (dutyline-gateway) and the transports. Webhook handlers resolve raw
//! inbound text to an [`Intent`], record responses through [`record`], and
//! the notification service drives first delivery plus escalation enqueue.

pub mod correlate;
pub mod deliver;
pub mod parser;
pub mod record;
pub mod service;
pub mod shortcode;

pub use parser::{parse_inbound, Intent};
pub use service::CreateNotification;
