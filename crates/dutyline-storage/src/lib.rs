// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for Dutyline.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a
//! single-writer concurrency model via `tokio-rusqlite`, and typed query
//! modules for users, sessions, notifications, deliveries, responses,
//! escalation policies, and escalation jobs.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread: query functions accept `&Database` and go through
//! `connection().call()`. Do NOT create additional Connection instances
//! for writes.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use database::Database;
pub use models::*;
