// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for Dutyline.

use thiserror::Error;

/// The primary error type used across Dutyline crates.
#[derive(Debug, Error)]
pub enum DutylineError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Channel transport errors (Slack API failure, Twilio failure, message format).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DutylineError {
    /// Wrap an arbitrary error as a storage error.
    pub fn storage<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        DutylineError::Storage {
            source: Box::new(source),
        }
    }

    /// Build a channel error with a message and an underlying cause.
    pub fn channel<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        DutylineError::Channel {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
