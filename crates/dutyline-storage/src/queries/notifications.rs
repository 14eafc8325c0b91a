// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification CRUD and the lookups backing inbound reply resolution.

use dutyline_core::DutylineError;
use rusqlite::{params, Row};

use crate::database::{map_tr_err, Database};
use crate::models::{Notification, NotificationStatus};
use crate::queries::{column_enum, column_json_opt, column_string_list};

const NOTIFICATION_COLUMNS: &str = "id, short_code, user_id, session_id, message, priority, \
     context, tags, options, status, snoozed_until, current_escalation_step, policy_id, \
     created_at, updated_at";

fn map_notification_row(row: &Row<'_>) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: row.get(0)?,
        short_code: row.get(1)?,
        user_id: row.get(2)?,
        session_id: row.get(3)?,
        message: row.get(4)?,
        priority: row.get(5)?,
        context: column_json_opt(6, row.get(6)?)?,
        tags: column_string_list(7, row.get(7)?)?,
        options: column_string_list(8, row.get(8)?)?,
        status: column_enum(9, row.get(9)?)?,
        snoozed_until: row.get(10)?,
        current_escalation_step: row.get(11)?,
        policy_id: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

/// Input for [`create_notification`].
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub short_code: String,
    pub user_id: String,
    pub session_id: Option<String>,
    pub message: String,
    pub priority: i64,
    pub context: Option<serde_json::Value>,
    pub tags: Vec<String>,
    pub options: Vec<String>,
    pub policy_id: Option<String>,
}

/// Insert a new notification in status `pending`. Returns the stored row.
pub async fn create_notification(
    db: &Database,
    new: NewNotification,
) -> Result<Notification, DutylineError> {
    let id = uuid::Uuid::new_v4().to_string();
    let context = match &new.context {
        Some(v) => Some(serde_json::to_string(v).map_err(DutylineError::storage)?),
        None => None,
    };
    let tags = serde_json::to_string(&new.tags).map_err(DutylineError::storage)?;
    let options = serde_json::to_string(&new.options).map_err(DutylineError::storage)?;
    db.connection()
        .call(move |conn| {
            let notification = conn.query_row(
                &format!(
                    "INSERT INTO notifications
                         (id, short_code, user_id, session_id, message, priority,
                          context, tags, options, policy_id)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                     RETURNING {NOTIFICATION_COLUMNS}"
                ),
                params![
                    id,
                    new.short_code,
                    new.user_id,
                    new.session_id,
                    new.message,
                    new.priority,
                    context,
                    tags,
                    options,
                    new.policy_id,
                ],
                map_notification_row,
            )?;
            Ok(notification)
        })
        .await
        .map_err(map_tr_err)
}

/// Get a notification by id.
pub async fn get_notification(
    db: &Database,
    id: &str,
) -> Result<Option<Notification>, DutylineError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1"),
                params![id],
                map_notification_row,
            );
            match result {
                Ok(n) => Ok(Some(n)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Resolve a notification owned by `user_id` by full id or short code.
pub async fn find_by_id_or_short_code(
    db: &Database,
    id_or_code: &str,
    user_id: &str,
) -> Result<Option<Notification>, DutylineError> {
    let id_or_code = id_or_code.to_string();
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!(
                    "SELECT {NOTIFICATION_COLUMNS} FROM notifications
                     WHERE (id = ?1 OR short_code = ?1) AND user_id = ?2
                     ORDER BY created_at DESC, rowid DESC
                     LIMIT 1"
                ),
                params![id_or_code, user_id],
                map_notification_row,
            );
            match result {
                Ok(n) => Ok(Some(n)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Find a user's *active* (pending or delivered) notification by short code.
pub async fn find_active_by_short_code(
    db: &Database,
    short_code: &str,
    user_id: &str,
) -> Result<Option<Notification>, DutylineError> {
    let short_code = short_code.to_string();
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!(
                    "SELECT {NOTIFICATION_COLUMNS} FROM notifications
                     WHERE short_code = ?1 AND user_id = ?2
                       AND status IN ('pending', 'delivered')"
                ),
                params![short_code, user_id],
                map_notification_row,
            );
            match result {
                Ok(n) => Ok(Some(n)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Whether a short code is currently in use by any active notification.
pub async fn short_code_in_active_use(
    db: &Database,
    short_code: &str,
) -> Result<bool, DutylineError> {
    let short_code = short_code.to_string();
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM notifications
                 WHERE short_code = ?1 AND status IN ('pending', 'delivered')",
                params![short_code],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// The most recently created `delivered` notification for a user, if any.
///
/// This is the target for numeric and freeform replies that carry no short
/// code.
pub async fn latest_delivered_for_user(
    db: &Database,
    user_id: &str,
) -> Result<Option<Notification>, DutylineError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!(
                    "SELECT {NOTIFICATION_COLUMNS} FROM notifications
                     WHERE user_id = ?1 AND status = 'delivered'
                     ORDER BY created_at DESC, rowid DESC
                     LIMIT 1"
                ),
                params![user_id],
                map_notification_row,
            );
            match result {
                Ok(n) => Ok(Some(n)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// The newest notification a user owns inside a session (thread fallback).
pub async fn latest_in_session_for_user(
    db: &Database,
    session_id: &str,
    user_id: &str,
) -> Result<Option<Notification>, DutylineError> {
    let session_id = session_id.to_string();
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!(
                    "SELECT {NOTIFICATION_COLUMNS} FROM notifications
                     WHERE session_id = ?1 AND user_id = ?2
                     ORDER BY created_at DESC, rowid DESC
                     LIMIT 1"
                ),
                params![session_id, user_id],
                map_notification_row,
            );
            match result {
                Ok(n) => Ok(Some(n)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// List a user's notifications newest-first, optionally filtered by status.
pub async fn list_for_user(
    db: &Database,
    user_id: &str,
    status: Option<NotificationStatus>,
    limit: i64,
) -> Result<Vec<Notification>, DutylineError> {
    let user_id = user_id.to_string();
    let status = status.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            let mut notifications = Vec::new();
            match &status {
                Some(status_filter) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {NOTIFICATION_COLUMNS} FROM notifications
                         WHERE user_id = ?1 AND status = ?2
                         ORDER BY created_at DESC, rowid DESC
                         LIMIT ?3"
                    ))?;
                    let rows =
                        stmt.query_map(params![user_id, status_filter, limit], map_notification_row)?;
                    for row in rows {
                        notifications.push(row?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {NOTIFICATION_COLUMNS} FROM notifications
                         WHERE user_id = ?1
                         ORDER BY created_at DESC, rowid DESC
                         LIMIT ?2"
                    ))?;
                    let rows = stmt.query_map(params![user_id, limit], map_notification_row)?;
                    for row in rows {
                        notifications.push(row?);
                    }
                }
            }
            Ok(notifications)
        })
        .await
        .map_err(map_tr_err)
}

/// Set a notification's status.
pub async fn set_status(
    db: &Database,
    id: &str,
    status: NotificationStatus,
) -> Result<(), DutylineError> {
    let id = id.to_string();
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE notifications SET status = ?2,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id, status],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Suspend escalation for `seconds` without changing status.
pub async fn set_snoozed_until(
    db: &Database,
    id: &str,
    seconds: i64,
) -> Result<(), DutylineError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE notifications SET snoozed_until =
                     strftime('%Y-%m-%dT%H:%M:%fZ', 'now', '+' || ?2 || ' seconds'),
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id, seconds],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record an executed escalation step and (re-)mark the notification
/// delivered. Idempotent with respect to status.
pub async fn advance_escalation_step(
    db: &Database,
    id: &str,
    step: i64,
) -> Result<(), DutylineError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE notifications SET current_escalation_step = ?2, status = 'delivered',
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id, step],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Count notifications by status (for the status CLI).
pub async fn count_by_status(db: &Database) -> Result<Vec<(String, i64)>, DutylineError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT status, COUNT(*) FROM notifications GROUP BY status ORDER BY status",
            )?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            let mut counts = Vec::new();
            for row in rows {
                counts.push(row?);
            }
            Ok(counts)
        })
        .await
        .map_err(map_tr_err)
}
