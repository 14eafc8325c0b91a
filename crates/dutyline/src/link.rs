// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `dutyline link` command implementation: generate a one-time Slack link
//! code to DM to the bot.

use dutyline_config::model::DutylineConfig;
use dutyline_core::DutylineError;
use dutyline_dispatch::service;
use dutyline_storage::queries::users;
use dutyline_storage::Database;

/// Generate and print a Slack link code for the user named by email.
pub async fn run_link(config: DutylineConfig, email: &str) -> Result<(), DutylineError> {
    let db = Database::open(&config.storage.database_path).await?;

    let Some(user) = users::get_user_by_email(&db, email).await? else {
        return Err(DutylineError::NotFound {
            entity: "user",
            id: email.to_string(),
        });
    };

    let code = service::generate_link_code(&db, &user.id).await?;
    println!("DM this code to the Dutyline bot within 15 minutes: {code}");

    db.close().await?;
    Ok(())
}
