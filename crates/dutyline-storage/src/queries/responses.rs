// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recorded human replies.

use dutyline_core::DutylineError;
use rusqlite::{params, Row};

use crate::database::{map_tr_err, Database};
use crate::models::{Channel, ResponseRecord};
use crate::queries::column_enum;

const RESPONSE_COLUMNS: &str =
    "id, notification_id, channel, text, selected_option, external_id, responder_id, created_at";

fn map_response_row(row: &Row<'_>) -> rusqlite::Result<ResponseRecord> {
    Ok(ResponseRecord {
        id: row.get(0)?,
        notification_id: row.get(1)?,
        channel: column_enum(2, row.get(2)?)?,
        text: row.get(3)?,
        selected_option: row.get(4)?,
        external_id: row.get(5)?,
        responder_id: row.get(6)?,
        created_at: row.get(7)?,
    })
}

/// Append a response row. Responses are history: repeated replies to the
/// same notification each get their own row.
pub async fn record_response(
    db: &Database,
    notification_id: &str,
    channel: Channel,
    text: Option<&str>,
    selected_option: Option<&str>,
    external_id: Option<&str>,
    responder_id: &str,
) -> Result<ResponseRecord, DutylineError> {
    let id = uuid::Uuid::new_v4().to_string();
    let notification_id = notification_id.to_string();
    let channel = channel.to_string();
    let text = text.map(|s| s.to_string());
    let selected_option = selected_option.map(|s| s.to_string());
    let external_id = external_id.map(|s| s.to_string());
    let responder_id = responder_id.to_string();
    db.connection()
        .call(move |conn| {
            let response = conn.query_row(
                &format!(
                    "INSERT INTO responses
                         (id, notification_id, channel, text, selected_option,
                          external_id, responder_id)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                     RETURNING {RESPONSE_COLUMNS}"
                ),
                params![
                    id,
                    notification_id,
                    channel,
                    text,
                    selected_option,
                    external_id,
                    responder_id,
                ],
                map_response_row,
            )?;
            Ok(response)
        })
        .await
        .map_err(map_tr_err)
}

/// List responses for a notification, oldest first.
pub async fn list_for_notification(
    db: &Database,
    notification_id: &str,
) -> Result<Vec<ResponseRecord>, DutylineError> {
    let notification_id = notification_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RESPONSE_COLUMNS} FROM responses
                 WHERE notification_id = ?1
                 ORDER BY created_at ASC, rowid ASC"
            ))?;
            let rows = stmt.query_map(params![notification_id], map_response_row)?;
            let mut responses = Vec::new();
            for row in rows {
                responses.push(row?);
            }
            Ok(responses)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::{notifications, users};

    #[tokio::test]
    async fn multiple_responses_are_preserved_as_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.db").display().to_string();
        let db = Database::open(&path).await.unwrap();
        let user = users::create_user(&db, "dev@example.com", None, None).await.unwrap();
        let n = notifications::create_notification(
            &db,
            notifications::NewNotification {
                short_code: "ABC".into(),
                user_id: user.id.clone(),
                session_id: None,
                message: "msg".into(),
                priority: 3,
                context: None,
                tags: vec![],
                options: vec!["Fix".into()],
                policy_id: None,
            },
        )
        .await
        .unwrap();

        record_response(&db, &n.id, Channel::Sms, None, Some("Fix"), None, &user.id)
            .await
            .unwrap();
        record_response(&db, &n.id, Channel::Slack, Some("actually, revert"), None, None, &user.id)
            .await
            .unwrap();

        let all = list_for_notification(&db, &n.id).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].selected_option.as_deref(), Some("Fix"));
        assert_eq!(all[1].text.as_deref(), Some("actually, revert"));
    }
}
