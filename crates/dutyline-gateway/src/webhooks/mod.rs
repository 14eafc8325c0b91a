// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound webhook handlers for the two reply channels.

pub mod slack;
pub mod twilio;
