// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User CRUD and Slack account linking.

use dutyline_core::DutylineError;
use rusqlite::{params, Row};

use crate::database::{map_tr_err, Database};
use crate::models::User;

const USER_COLUMNS: &str = "id, email, name, phone, slack_user_id, slack_team_id, \
     slack_link_code, slack_link_code_expires_at, timezone, created_at, updated_at";

fn map_user_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        phone: row.get(3)?,
        slack_user_id: row.get(4)?,
        slack_team_id: row.get(5)?,
        slack_link_code: row.get(6)?,
        slack_link_code_expires_at: row.get(7)?,
        timezone: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

/// Create a new user. Returns the stored row.
pub async fn create_user(
    db: &Database,
    email: &str,
    name: Option<&str>,
    phone: Option<&str>,
) -> Result<User, DutylineError> {
    let id = uuid::Uuid::new_v4().to_string();
    let email = email.to_string();
    let name = name.map(|s| s.to_string());
    let phone = phone.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            let user = conn.query_row(
                &format!(
                    "INSERT INTO users (id, email, name, phone) VALUES (?1, ?2, ?3, ?4)
                     RETURNING {USER_COLUMNS}"
                ),
                params![id, email, name, phone],
                map_user_row,
            )?;
            Ok(user)
        })
        .await
        .map_err(map_tr_err)
}

/// Get a user by id.
pub async fn get_user(db: &Database, id: &str) -> Result<Option<User>, DutylineError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                map_user_row,
            );
            match result {
                Ok(user) => Ok(Some(user)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Get a user by email.
pub async fn get_user_by_email(db: &Database, email: &str) -> Result<Option<User>, DutylineError> {
    let email = email.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                params![email],
                map_user_row,
            );
            match result {
                Ok(user) => Ok(Some(user)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Find the user linked to a Slack member id.
pub async fn get_user_by_slack_id(
    db: &Database,
    slack_user_id: &str,
) -> Result<Option<User>, DutylineError> {
    let slack_user_id = slack_user_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE slack_user_id = ?1"),
                params![slack_user_id],
                map_user_row,
            );
            match result {
                Ok(user) => Ok(Some(user)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Find the user registered under a phone number.
pub async fn get_user_by_phone(db: &Database, phone: &str) -> Result<Option<User>, DutylineError> {
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE phone = ?1"),
                params![phone],
                map_user_row,
            );
            match result {
                Ok(user) => Ok(Some(user)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Store a one-time Slack link code on a user, valid for `ttl_seconds`.
pub async fn set_slack_link_code(
    db: &Database,
    user_id: &str,
    code: &str,
    ttl_seconds: i64,
) -> Result<(), DutylineError> {
    let user_id = user_id.to_string();
    let code = code.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE users SET slack_link_code = ?2,
                 slack_link_code_expires_at =
                     strftime('%Y-%m-%dT%H:%M:%fZ', 'now', '+' || ?3 || ' seconds'),
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![user_id, code, ttl_seconds],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Find the user holding an unexpired link code.
pub async fn find_user_by_link_code(
    db: &Database,
    code: &str,
) -> Result<Option<User>, DutylineError> {
    let code = code.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!(
                    "SELECT {USER_COLUMNS} FROM users
                     WHERE slack_link_code = ?1
                       AND slack_link_code_expires_at > strftime('%Y-%m-%dT%H:%M:%fZ', 'now')"
                ),
                params![code],
                map_user_row,
            );
            match result {
                Ok(user) => Ok(Some(user)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Link a Slack account to a user and consume the link code.
pub async fn link_slack_account(
    db: &Database,
    user_id: &str,
    slack_user_id: &str,
    slack_team_id: Option<&str>,
) -> Result<(), DutylineError> {
    let user_id = user_id.to_string();
    let slack_user_id = slack_user_id.to_string();
    let slack_team_id = slack_team_id.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE users SET slack_user_id = ?2, slack_team_id = ?3,
                 slack_link_code = NULL, slack_link_code_expires_at = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![user_id, slack_user_id, slack_team_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.db").display().to_string();
        let db = Database::open(&path).await.unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn create_and_lookup_by_phone_and_slack_id() {
        let (_dir, db) = test_db().await;
        let user = create_user(&db, "dev@example.com", Some("Dev"), Some("+15550001111"))
            .await
            .unwrap();
        assert_eq!(user.email, "dev@example.com");
        assert!(user.slack_user_id.is_none());

        let by_phone = get_user_by_phone(&db, "+15550001111").await.unwrap().unwrap();
        assert_eq!(by_phone.id, user.id);

        link_slack_account(&db, &user.id, "U123", Some("T123")).await.unwrap();
        let by_slack = get_user_by_slack_id(&db, "U123").await.unwrap().unwrap();
        assert_eq!(by_slack.id, user.id);
        assert_eq!(by_slack.slack_team_id.as_deref(), Some("T123"));
    }

    #[tokio::test]
    async fn link_code_round_trip_and_consumption() {
        let (_dir, db) = test_db().await;
        let user = create_user(&db, "dev@example.com", None, None).await.unwrap();

        set_slack_link_code(&db, &user.id, "LINK-A1B2C3", 900).await.unwrap();
        let found = find_user_by_link_code(&db, "LINK-A1B2C3").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);

        link_slack_account(&db, &user.id, "U777", None).await.unwrap();
        // Code is single-use.
        assert!(find_user_by_link_code(&db, "LINK-A1B2C3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_link_code_is_not_found() {
        let (_dir, db) = test_db().await;
        let user = create_user(&db, "dev@example.com", None, None).await.unwrap();
        set_slack_link_code(&db, &user.id, "LINK-ZZZZZZ", -60).await.unwrap();
        assert!(find_user_by_link_code(&db, "LINK-ZZZZZZ").await.unwrap().is_none());
    }
}
