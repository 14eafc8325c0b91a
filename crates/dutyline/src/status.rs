// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `dutyline status` command implementation.

use dutyline_config::model::DutylineConfig;
use dutyline_core::DutylineError;
use dutyline_storage::queries::notifications;
use dutyline_storage::Database;

/// Print notification counts by status.
pub async fn run_status(config: DutylineConfig) -> Result<(), DutylineError> {
    let db = Database::open(&config.storage.database_path).await?;
    let counts = notifications::count_by_status(&db).await?;

    if counts.is_empty() {
        println!("no notifications yet");
    } else {
        for (status, count) in counts {
            println!("{status:>10}  {count}");
        }
    }

    db.close().await?;
    Ok(())
}
