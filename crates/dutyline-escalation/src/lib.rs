// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable escalation scheduler for Dutyline.
//!
//! Unanswered notifications re-deliver through their policy's timed channel
//! steps until a response lands or the steps run out. The schedule lives in
//! the `escalation_jobs` table -- one row per notification -- so it survives
//! process restarts; [`EscalationRunner`] is the polling driver that claims
//! due jobs and executes one step per claim.
//!
//! Cancellation is cooperative and keyed by notification id: recording a
//! response flips the job to `cancelled`, and the driver never claims
//! non-pending jobs. A step already claimed when the cancel lands still
//! completes its send; the race is bounded by the poll interval and is an
//! accepted tradeoff.

pub mod runner;

pub use runner::EscalationRunner;
