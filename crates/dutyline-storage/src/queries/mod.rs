// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per entity.

pub mod deliveries;
pub mod jobs;
pub mod notifications;
pub mod policies;
pub mod responses;
pub mod sessions;
pub mod users;

use std::str::FromStr;

/// Parse a TEXT column into a strum-backed enum, surfacing parse failures
/// as rusqlite conversion errors so they propagate like any other row error.
pub(crate) fn column_enum<T>(idx: usize, raw: String) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    T::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Parse a JSON TEXT column holding a string list.
pub(crate) fn column_string_list(idx: usize, raw: String) -> rusqlite::Result<Vec<String>> {
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Parse an optional JSON TEXT column holding an arbitrary value.
pub(crate) fn column_json_opt(
    idx: usize,
    raw: Option<String>,
) -> rusqlite::Result<Option<serde_json::Value>> {
    match raw {
        None => Ok(None),
        Some(s) => serde_json::from_str(&s).map(Some).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        }),
    }
}
