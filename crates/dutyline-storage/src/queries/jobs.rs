// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable escalation jobs: the persisted timer table behind the scheduler.
//!
//! One row per notification. A claim atomically pushes `due_at` forward by a
//! lock window inside a transaction, so a crashed driver re-claims the job
//! after the window instead of losing it.

use dutyline_core::DutylineError;
use rusqlite::{params, Row};

use crate::database::{map_tr_err, Database};
use crate::models::EscalationJob;
use crate::queries::column_enum;

const JOB_COLUMNS: &str =
    "notification_id, policy_id, next_step, due_at, status, created_at, updated_at";

fn map_job_row(row: &Row<'_>) -> rusqlite::Result<EscalationJob> {
    Ok(EscalationJob {
        notification_id: row.get(0)?,
        policy_id: row.get(1)?,
        next_step: row.get(2)?,
        due_at: row.get(3)?,
        status: column_enum(4, row.get(4)?)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

/// Enqueue an escalation job due in `delay_seconds` (0 = immediately).
///
/// A job already queued for the notification is left untouched.
pub async fn enqueue_job(
    db: &Database,
    notification_id: &str,
    policy_id: Option<&str>,
    delay_seconds: i64,
) -> Result<(), DutylineError> {
    let notification_id = notification_id.to_string();
    let policy_id = policy_id.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO escalation_jobs (notification_id, policy_id, due_at)
                 VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ', 'now', '+' || ?3 || ' seconds'))",
                params![notification_id, policy_id, delay_seconds],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Atomically claim the next due pending job.
///
/// The claim pushes `due_at` forward by `lock_seconds` inside a transaction;
/// if the driver crashes mid-step, the job comes due again after the lock
/// window and the step is retried (duplicate sends are an accepted tradeoff).
pub async fn claim_due_job(
    db: &Database,
    lock_seconds: i64,
) -> Result<Option<EscalationJob>, DutylineError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let result = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {JOB_COLUMNS} FROM escalation_jobs
                     WHERE status = 'pending'
                       AND due_at <= strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     ORDER BY due_at ASC
                     LIMIT 1"
                ))?;
                stmt.query_row([], map_job_row)
            };

            match result {
                Ok(job) => {
                    tx.execute(
                        "UPDATE escalation_jobs SET
                         due_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', '+' || ?2 || ' seconds'),
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                         WHERE notification_id = ?1",
                        params![job.notification_id, lock_seconds],
                    )?;
                    tx.commit()?;
                    Ok(Some(job))
                }
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    tx.commit()?;
                    Ok(None)
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Schedule the next step of a job.
pub async fn reschedule_job(
    db: &Database,
    notification_id: &str,
    next_step: i64,
    delay_seconds: i64,
) -> Result<(), DutylineError> {
    let notification_id = notification_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE escalation_jobs SET next_step = ?2,
                 due_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', '+' || ?3 || ' seconds'),
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE notification_id = ?1 AND status = 'pending'",
                params![notification_id, next_step, delay_seconds],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Defer a job to a specific instant (snooze support).
pub async fn defer_job(
    db: &Database,
    notification_id: &str,
    until: &str,
) -> Result<(), DutylineError> {
    let notification_id = notification_id.to_string();
    let until = until.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE escalation_jobs SET due_at = ?2,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE notification_id = ?1 AND status = 'pending'",
                params![notification_id, until],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Mark a job as finished after its last step. A job cancelled mid-flight
/// stays cancelled.
pub async fn complete_job(db: &Database, notification_id: &str) -> Result<(), DutylineError> {
    let notification_id = notification_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE escalation_jobs SET status = 'done',
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE notification_id = ?1 AND status = 'pending'",
                params![notification_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Cancel a pending job. Returns whether a job was actually cancelled;
/// stray signals for unknown or finished jobs return `false`.
pub async fn cancel_job(db: &Database, notification_id: &str) -> Result<bool, DutylineError> {
    let notification_id = notification_id.to_string();
    db.connection()
        .call(move |conn| {
            let affected = conn.execute(
                "UPDATE escalation_jobs SET status = 'cancelled',
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE notification_id = ?1 AND status = 'pending'",
                params![notification_id],
            )?;
            Ok(affected > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Get a job by notification id.
pub async fn get_job(
    db: &Database,
    notification_id: &str,
) -> Result<Option<EscalationJob>, DutylineError> {
    let notification_id = notification_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {JOB_COLUMNS} FROM escalation_jobs WHERE notification_id = ?1"),
                params![notification_id],
                map_job_row,
            );
            match result {
                Ok(job) => Ok(Some(job)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EscalationJobStatus;
    use crate::queries::{notifications, users};

    async fn seeded_db() -> (tempfile::TempDir, Database, String) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.db").display().to_string();
        let db = Database::open(&path).await.unwrap();
        let user = users::create_user(&db, "dev@example.com", None, None).await.unwrap();
        let n = notifications::create_notification(
            &db,
            notifications::NewNotification {
                short_code: "ABC".into(),
                user_id: user.id,
                session_id: None,
                message: "msg".into(),
                priority: 3,
                context: None,
                tags: vec![],
                options: vec![],
                policy_id: None,
            },
        )
        .await
        .unwrap();
        (dir, db, n.id)
    }

    #[tokio::test]
    async fn enqueue_claim_reschedule_complete() {
        let (_dir, db, nid) = seeded_db().await;

        enqueue_job(&db, &nid, None, 0).await.unwrap();
        // Idempotent enqueue.
        enqueue_job(&db, &nid, None, 3600).await.unwrap();

        let claimed = claim_due_job(&db, 300).await.unwrap().unwrap();
        assert_eq!(claimed.notification_id, nid);
        assert_eq!(claimed.next_step, 0);

        // Locked: nothing else is due.
        assert!(claim_due_job(&db, 300).await.unwrap().is_none());

        reschedule_job(&db, &nid, 1, 0).await.unwrap();
        let claimed = claim_due_job(&db, 300).await.unwrap().unwrap();
        assert_eq!(claimed.next_step, 1);

        complete_job(&db, &nid).await.unwrap();
        let job = get_job(&db, &nid).await.unwrap().unwrap();
        assert_eq!(job.status, EscalationJobStatus::Done);
    }

    #[tokio::test]
    async fn future_jobs_are_not_claimed() {
        let (_dir, db, nid) = seeded_db().await;
        enqueue_job(&db, &nid, None, 3600).await.unwrap();
        assert!(claim_due_job(&db, 300).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cancel_is_idempotent_and_reports_stray_signals() {
        let (_dir, db, nid) = seeded_db().await;
        enqueue_job(&db, &nid, None, 0).await.unwrap();

        assert!(cancel_job(&db, &nid).await.unwrap());
        // Second cancel is a stray signal.
        assert!(!cancel_job(&db, &nid).await.unwrap());
        // Unknown notification is a stray signal too.
        assert!(!cancel_job(&db, "nope").await.unwrap());

        // Cancelled jobs are never claimed.
        assert!(claim_due_job(&db, 300).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn defer_pushes_a_due_job_into_the_future() {
        let (_dir, db, nid) = seeded_db().await;
        enqueue_job(&db, &nid, None, 0).await.unwrap();

        defer_job(&db, &nid, "2999-01-01T00:00:00.000Z").await.unwrap();
        assert!(claim_due_job(&db, 300).await.unwrap().is_none());
    }
}
