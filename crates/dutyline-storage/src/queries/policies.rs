// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Escalation policies, steps, and priority routing.

use dutyline_core::DutylineError;
use rusqlite::{params, Row};

use crate::database::{map_tr_err, Database};
use crate::models::{Channel, EscalationPolicy, EscalationStep, PriorityRoute};
use crate::queries::column_enum;

fn map_policy_row(row: &Row<'_>) -> rusqlite::Result<EscalationPolicy> {
    Ok(EscalationPolicy {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        is_default: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn map_step_row(row: &Row<'_>) -> rusqlite::Result<EscalationStep> {
    Ok(EscalationStep {
        id: row.get(0)?,
        policy_id: row.get(1)?,
        step_order: row.get(2)?,
        channel: column_enum(3, row.get(3)?)?,
        delay_seconds: row.get(4)?,
    })
}

/// Create an escalation policy for a user.
pub async fn create_policy(
    db: &Database,
    user_id: &str,
    name: &str,
    is_default: bool,
) -> Result<EscalationPolicy, DutylineError> {
    let id = uuid::Uuid::new_v4().to_string();
    let user_id = user_id.to_string();
    let name = name.to_string();
    db.connection()
        .call(move |conn| {
            let policy = conn.query_row(
                "INSERT INTO escalation_policies (id, user_id, name, is_default)
                 VALUES (?1, ?2, ?3, ?4)
                 RETURNING id, user_id, name, is_default, created_at",
                params![id, user_id, name, is_default],
                map_policy_row,
            )?;
            Ok(policy)
        })
        .await
        .map_err(map_tr_err)
}

/// Append a step to a policy.
pub async fn add_step(
    db: &Database,
    policy_id: &str,
    step_order: i64,
    channel: Channel,
    delay_seconds: i64,
) -> Result<EscalationStep, DutylineError> {
    let id = uuid::Uuid::new_v4().to_string();
    let policy_id = policy_id.to_string();
    let channel = channel.to_string();
    db.connection()
        .call(move |conn| {
            let step = conn.query_row(
                "INSERT INTO escalation_steps (id, policy_id, step_order, channel, delay_seconds)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 RETURNING id, policy_id, step_order, channel, delay_seconds",
                params![id, policy_id, step_order, channel, delay_seconds],
                map_step_row,
            )?;
            Ok(step)
        })
        .await
        .map_err(map_tr_err)
}

/// All steps of a policy in ascending step order.
pub async fn steps_for_policy(
    db: &Database,
    policy_id: &str,
) -> Result<Vec<EscalationStep>, DutylineError> {
    let policy_id = policy_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, policy_id, step_order, channel, delay_seconds
                 FROM escalation_steps
                 WHERE policy_id = ?1
                 ORDER BY step_order ASC",
            )?;
            let rows = stmt.query_map(params![policy_id], map_step_row)?;
            let mut steps = Vec::new();
            for row in rows {
                steps.push(row?);
            }
            Ok(steps)
        })
        .await
        .map_err(map_tr_err)
}

/// A user's default policy, if one is marked.
pub async fn default_policy_for_user(
    db: &Database,
    user_id: &str,
) -> Result<Option<EscalationPolicy>, DutylineError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT id, user_id, name, is_default, created_at
                 FROM escalation_policies
                 WHERE user_id = ?1 AND is_default = 1
                 LIMIT 1",
                params![user_id],
                map_policy_row,
            );
            match result {
                Ok(p) => Ok(Some(p)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Create a priority -> policy route for a user.
pub async fn create_priority_route(
    db: &Database,
    user_id: &str,
    priority: i64,
    policy_id: &str,
) -> Result<PriorityRoute, DutylineError> {
    let id = uuid::Uuid::new_v4().to_string();
    let user_id = user_id.to_string();
    let policy_id = policy_id.to_string();
    db.connection()
        .call(move |conn| {
            let route = conn.query_row(
                "INSERT INTO priority_routes (id, user_id, priority, policy_id)
                 VALUES (?1, ?2, ?3, ?4)
                 RETURNING id, user_id, priority, policy_id",
                params![id, user_id, priority, policy_id],
                |row| {
                    Ok(PriorityRoute {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        priority: row.get(2)?,
                        policy_id: row.get(3)?,
                    })
                },
            )?;
            Ok(route)
        })
        .await
        .map_err(map_tr_err)
}

/// The route registered for a priority, if any.
pub async fn route_for_priority(
    db: &Database,
    user_id: &str,
    priority: i64,
) -> Result<Option<PriorityRoute>, DutylineError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT id, user_id, priority, policy_id
                 FROM priority_routes
                 WHERE user_id = ?1 AND priority = ?2
                 LIMIT 1",
                params![user_id, priority],
                |row| {
                    Ok(PriorityRoute {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        priority: row.get(2)?,
                        policy_id: row.get(3)?,
                    })
                },
            );
            match result {
                Ok(r) => Ok(Some(r)),
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
    use crate::queries::users;

    #[tokio::test]
    async fn steps_come_back_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.db").display().to_string();
        let db = Database::open(&path).await.unwrap();
        let user = users::create_user(&db, "dev@example.com", None, None).await.unwrap();

        let policy = create_policy(&db, &user.id, "urgent", true).await.unwrap();
        // Insert out of order on purpose.
        add_step(&db, &policy.id, 1, Channel::Sms, 300).await.unwrap();
        add_step(&db, &policy.id, 0, Channel::Slack, 0).await.unwrap();

        let steps = steps_for_policy(&db, &policy.id).await.unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].step_order, 0);
        assert_eq!(steps[0].channel, Channel::Slack);
        assert_eq!(steps[1].channel, Channel::Sms);
    }

    #[tokio::test]
    async fn priority_route_overrides_default_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.db").display().to_string();
        let db = Database::open(&path).await.unwrap();
        let user = users::create_user(&db, "dev@example.com", None, None).await.unwrap();

        let default_policy = create_policy(&db, &user.id, "default", true).await.unwrap();
        let urgent_policy = create_policy(&db, &user.id, "urgent", false).await.unwrap();
        create_priority_route(&db, &user.id, 1, &urgent_policy.id).await.unwrap();

        let route = route_for_priority(&db, &user.id, 1).await.unwrap().unwrap();
        assert_eq!(route.policy_id, urgent_policy.id);
        assert!(route_for_priority(&db, &user.id, 3).await.unwrap().is_none());

        let default = default_policy_for_user(&db, &user.id).await.unwrap().unwrap();
        assert_eq!(default.id, default_policy.id);
    }
}
