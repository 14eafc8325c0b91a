// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery attempt records, one row per channel send.

use dutyline_core::DutylineError;
use rusqlite::{params, Row};

use crate::database::{map_tr_err, Database};
use crate::models::{Channel, Delivery, DeliveryStatus};
use crate::queries::{column_enum, column_json_opt};

const DELIVERY_COLUMNS: &str =
    "id, notification_id, channel, status, external_id, metadata, error, created_at";

fn map_delivery_row(row: &Row<'_>) -> rusqlite::Result<Delivery> {
    Ok(Delivery {
        id: row.get(0)?,
        notification_id: row.get(1)?,
        channel: column_enum(2, row.get(2)?)?,
        status: column_enum(3, row.get(3)?)?,
        external_id: row.get(4)?,
        metadata: column_json_opt(5, row.get(5)?)?,
        error: row.get(6)?,
        created_at: row.get(7)?,
    })
}

/// Append a delivery record. Returns the stored row.
pub async fn record_delivery(
    db: &Database,
    notification_id: &str,
    channel: Channel,
    status: DeliveryStatus,
    external_id: Option<&str>,
    metadata: Option<serde_json::Value>,
    error: Option<&str>,
) -> Result<Delivery, DutylineError> {
    let id = uuid::Uuid::new_v4().to_string();
    let notification_id = notification_id.to_string();
    let channel = channel.to_string();
    let status = status.to_string();
    let external_id = external_id.map(|s| s.to_string());
    let metadata = match &metadata {
        Some(v) => Some(serde_json::to_string(v).map_err(DutylineError::storage)?),
        None => None,
    };
    let error = error.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            let delivery = conn.query_row(
                &format!(
                    "INSERT INTO deliveries
                         (id, notification_id, channel, status, external_id, metadata, error)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                     RETURNING {DELIVERY_COLUMNS}"
                ),
                params![id, notification_id, channel, status, external_id, metadata, error],
                map_delivery_row,
            )?;
            Ok(delivery)
        })
        .await
        .map_err(map_tr_err)
}

/// Find a delivery by its external message identifier on a channel.
///
/// Used to correlate a Slack thread reply back to the message that opened
/// the thread.
pub async fn find_by_external_id(
    db: &Database,
    external_id: &str,
    channel: Channel,
) -> Result<Option<Delivery>, DutylineError> {
    let external_id = external_id.to_string();
    let channel = channel.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!(
                    "SELECT {DELIVERY_COLUMNS} FROM deliveries
                     WHERE external_id = ?1 AND channel = ?2
                     ORDER BY created_at DESC, rowid DESC
                     LIMIT 1"
                ),
                params![external_id, channel],
                map_delivery_row,
            );
            match result {
                Ok(d) => Ok(Some(d)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// List all delivery attempts for a notification, oldest first.
pub async fn list_for_notification(
    db: &Database,
    notification_id: &str,
) -> Result<Vec<Delivery>, DutylineError> {
    let notification_id = notification_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {DELIVERY_COLUMNS} FROM deliveries
                 WHERE notification_id = ?1
                 ORDER BY created_at ASC, rowid ASC"
            ))?;
            let rows = stmt.query_map(params![notification_id], map_delivery_row)?;
            let mut deliveries = Vec::new();
            for row in rows {
                deliveries.push(row?);
            }
            Ok(deliveries)
        })
        .await
        .map_err(map_tr_err)
}
