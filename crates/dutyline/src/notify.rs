// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `dutyline notify` command implementation: create a notification against
//! the local database, delivering over whatever channels are configured.

use std::sync::Arc;

use dutyline_config::model::DutylineConfig;
use dutyline_core::DutylineError;
use dutyline_dispatch::service::{self, CreateNotification};
use dutyline_storage::queries::users;
use dutyline_storage::Database;

use crate::serve::{build_chat, build_sms};

/// Create and deliver a notification for the user named by email.
pub async fn run_notify(
    config: DutylineConfig,
    email: &str,
    message: &str,
    options: Vec<String>,
) -> Result<(), DutylineError> {
    let db = Arc::new(Database::open(&config.storage.database_path).await?);

    let Some(user) = users::get_user_by_email(&db, email).await? else {
        return Err(DutylineError::NotFound {
            entity: "user",
            id: email.to_string(),
        });
    };

    let chat = build_chat(&config);
    let sms = build_sms(&config);

    let notification = service::create_notification(
        &db,
        chat.as_deref(),
        sms.as_deref(),
        &user.id,
        CreateNotification {
            message: message.to_string(),
            options,
            ..Default::default()
        },
    )
    .await?;

    println!(
        "notification {} [{}] is {}",
        notification.id, notification.short_code, notification.status
    );

    db.close().await?;
    Ok(())
}
