// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types are defined in `dutyline-core::types` for use across
//! crate boundaries. This module re-exports them for convenience within the
//! storage crate.

pub use dutyline_core::types::{
    AgentSession, Channel, Delivery, DeliveryStatus, EscalationJob, EscalationJobStatus,
    EscalationPolicy, EscalationStep, Notification, NotificationStatus, PriorityRoute,
    ResponseRecord, User,
};
