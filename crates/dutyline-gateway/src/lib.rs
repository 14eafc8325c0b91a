// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for Dutyline.
//!
//! Serves three route classes:
//! - unauthenticated `/health`
//! - signature-verified webhooks (`/webhooks/slack/*`, `/webhooks/twilio/sms`)
//! - bearer-authenticated REST API under `/v1`
//!
//! Webhook handlers never propagate internal failures: upstream senders
//! retry on non-2xx, so every verified request is acknowledged benignly and
//! errors are logged instead. The one intentional non-2xx is a failed
//! signature check.

pub mod auth;
pub mod handlers;
pub mod server;
pub mod webhooks;

pub use server::{build_router, start_server, GatewayState, ServerConfig};
