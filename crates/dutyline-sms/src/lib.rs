// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Twilio SMS transport for Dutyline.
//!
//! Implements [`dutyline_core::SmsTransport`] against the Twilio Messages
//! API, renders TwiML replies for the inbound webhook, and verifies the
//! `X-Twilio-Signature` header on inbound requests.

pub mod client;
pub mod signature;
pub mod twiml;

pub use client::TwilioClient;
pub use signature::verify_signature;
pub use twiml::message_response;
