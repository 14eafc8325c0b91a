// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slack channel transport for Dutyline.
//!
//! Implements [`dutyline_core::ChatTransport`] against the Slack Web API:
//! notification messages rendered as Block Kit sections with option buttons,
//! in-thread posting, message updates after a response, and the custom
//! response modal. Inbound webhook verification lives in [`signature`].

pub mod blocks;
pub mod client;
pub mod signature;

pub use client::SlackClient;
pub use signature::verify_signature;
