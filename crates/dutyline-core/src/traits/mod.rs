// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport traits implemented by channel crates and mocked in tests.

pub mod chat;
pub mod sms;

pub use chat::{ChatPost, ChatTransport, PostedMessage};
pub use sms::SmsTransport;
