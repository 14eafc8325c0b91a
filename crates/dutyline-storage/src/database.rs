// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. The `Database` struct IS the single writer; query modules accept
//! `&Database` and call through `connection().call()`.

use std::path::Path;

use dutyline_core::DutylineError;
use tracing::debug;

/// Handle to the single SQLite connection.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path`, apply PRAGMAs, and run
    /// pending migrations.
    pub async fn open(path: &str) -> Result<Self, DutylineError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(DutylineError::storage)?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(DutylineError::storage)?;

        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
            )
            .map_err(DutylineError::storage)?;
            crate::migrations::run_migrations(conn)?;
            Ok(())
        })
        .await
        .map_err(|e| match e {
            tokio_rusqlite::Error::Error(de) => de,
            e => DutylineError::storage(e),
        })?;

        debug!(path, "database opened");
        Ok(Self { conn })
    }

    /// Access the underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close cleanly.
    pub async fn close(&self) -> Result<(), DutylineError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

/// Bridge tokio-rusqlite errors into the workspace error type.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error) -> DutylineError {
    DutylineError::Storage {
        source: Box::new(e),
    }
}
