// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent session lookup and thread identity persistence.

use dutyline_core::DutylineError;
use rusqlite::{params, Row};

use crate::database::{map_tr_err, Database};
use crate::models::AgentSession;

const SESSION_COLUMNS: &str =
    "id, user_id, session_key, workspace, slack_channel_id, slack_thread_ts, created_at";

fn map_session_row(row: &Row<'_>) -> rusqlite::Result<AgentSession> {
    Ok(AgentSession {
        id: row.get(0)?,
        user_id: row.get(1)?,
        session_key: row.get(2)?,
        workspace: row.get(3)?,
        slack_channel_id: row.get(4)?,
        slack_thread_ts: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Create a new session for a user.
pub async fn create_session(
    db: &Database,
    user_id: &str,
    session_key: &str,
    workspace: Option<&str>,
) -> Result<AgentSession, DutylineError> {
    let id = uuid::Uuid::new_v4().to_string();
    let user_id = user_id.to_string();
    let session_key = session_key.to_string();
    let workspace = workspace.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            let session = conn.query_row(
                &format!(
                    "INSERT INTO agent_sessions (id, user_id, session_key, workspace)
                     VALUES (?1, ?2, ?3, ?4)
                     RETURNING {SESSION_COLUMNS}"
                ),
                params![id, user_id, session_key, workspace],
                map_session_row,
            )?;
            Ok(session)
        })
        .await
        .map_err(map_tr_err)
}

/// Get a session by id.
pub async fn get_session(db: &Database, id: &str) -> Result<Option<AgentSession>, DutylineError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM agent_sessions WHERE id = ?1"),
                params![id],
                map_session_row,
            );
            match result {
                Ok(session) => Ok(Some(session)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Find a user's session by its client-supplied key.
pub async fn find_session_by_key(
    db: &Database,
    user_id: &str,
    session_key: &str,
) -> Result<Option<AgentSession>, DutylineError> {
    let user_id = user_id.to_string();
    let session_key = session_key.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM agent_sessions
                     WHERE user_id = ?1 AND session_key = ?2"
                ),
                params![user_id, session_key],
                map_session_row,
            );
            match result {
                Ok(session) => Ok(Some(session)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Find the session that owns a Slack thread.
pub async fn find_session_by_thread(
    db: &Database,
    thread_ts: &str,
) -> Result<Option<AgentSession>, DutylineError> {
    let thread_ts = thread_ts.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM agent_sessions WHERE slack_thread_ts = ?1"
                ),
                params![thread_ts],
                map_session_row,
            );
            match result {
                Ok(session) => Ok(Some(session)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Persist the Slack thread identity onto a session after the first
/// delivery establishes it.
pub async fn set_session_thread(
    db: &Database,
    session_id: &str,
    slack_channel_id: &str,
    slack_thread_ts: &str,
) -> Result<(), DutylineError> {
    let session_id = session_id.to_string();
    let slack_channel_id = slack_channel_id.to_string();
    let slack_thread_ts = slack_thread_ts.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE agent_sessions SET slack_channel_id = ?2, slack_thread_ts = ?3
                 WHERE id = ?1",
                params![session_id, slack_channel_id, slack_thread_ts],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::users;

    async fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.db").display().to_string();
        let db = Database::open(&path).await.unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn session_key_lookup_is_scoped_to_user() {
        let (_dir, db) = test_db().await;
        let alice = users::create_user(&db, "alice@example.com", None, None).await.unwrap();
        let bob = users::create_user(&db, "bob@example.com", None, None).await.unwrap();

        create_session(&db, &alice.id, "run-1", Some("repo-a")).await.unwrap();

        assert!(find_session_by_key(&db, &alice.id, "run-1").await.unwrap().is_some());
        assert!(find_session_by_key(&db, &bob.id, "run-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn thread_identity_persists_and_resolves() {
        let (_dir, db) = test_db().await;
        let user = users::create_user(&db, "dev@example.com", None, None).await.unwrap();
        let session = create_session(&db, &user.id, "run-1", None).await.unwrap();
        assert!(session.slack_thread_ts.is_none());

        set_session_thread(&db, &session.id, "D042", "1719000000.000100").await.unwrap();

        let found = find_session_by_thread(&db, "1719000000.000100").await.unwrap().unwrap();
        assert_eq!(found.id, session.id);
        assert_eq!(found.slack_channel_id.as_deref(), Some("D042"));
    }
}
