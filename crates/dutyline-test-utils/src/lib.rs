// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Dutyline: mock transports and a sqlite harness.
//!
//! `MockChat` and `MockSms` implement the core transport traits with
//! captured sends and injectable failures. `TestHarness` wires them to a
//! migrated temp-file database and seeds users.

pub mod harness;
pub mod mock_chat;
pub mod mock_sms;

pub use harness::TestHarness;
pub use mock_chat::{MockChat, RecordedChatPost, RecordedUpdate};
pub use mock_sms::MockSms;
