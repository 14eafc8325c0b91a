// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Isolated test environment: temp sqlite database plus mock transports.

use std::sync::Arc;

use dutyline_core::User;
use dutyline_storage::queries::users;
use dutyline_storage::Database;

use crate::mock_chat::MockChat;
use crate::mock_sms::MockSms;

/// A fully isolated Dutyline environment for one test.
///
/// Each harness owns a migrated temp-file database (WAL mode needs a real
/// file) and fresh mock transports. Tests are independent and
/// order-insensitive. The database is behind an `Arc` so components that
/// hold a shared handle (the escalation runner, the gateway state) can be
/// built directly from the harness.
pub struct TestHarness {
    _dir: tempfile::TempDir,
    pub db: Arc<Database>,
    pub chat: Arc<MockChat>,
    pub sms: Arc<MockSms>,
}

impl TestHarness {
    /// Create a harness with an empty, migrated database.
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("dutyline.db").display().to_string();
        let db = Database::open(&path).await.expect("open test db");
        Self {
            _dir: dir,
            db: Arc::new(db),
            chat: Arc::new(MockChat::new()),
            sms: Arc::new(MockSms::new()),
        }
    }

    /// Seed a user with no linked channels.
    pub async fn user(&self, email: &str) -> User {
        users::create_user(&self.db, email, None, None)
            .await
            .expect("create user")
    }

    /// Seed a user linked to a Slack account.
    pub async fn user_with_slack(&self, email: &str, slack_user_id: &str) -> User {
        let user = users::create_user(&self.db, email, None, None)
            .await
            .expect("create user");
        users::link_slack_account(&self.db, &user.id, slack_user_id, Some("T-MOCK"))
            .await
            .expect("link slack");
        users::get_user(&self.db, &user.id)
            .await
            .expect("refetch user")
            .expect("user exists")
    }

    /// Seed a user with a phone number only.
    pub async fn user_with_phone(&self, email: &str, phone: &str) -> User {
        users::create_user(&self.db, email, None, Some(phone))
            .await
            .expect("create user")
    }

    /// Seed a user with both a Slack link and a phone number.
    pub async fn user_with_both(&self, email: &str, slack_user_id: &str, phone: &str) -> User {
        let user = users::create_user(&self.db, email, None, Some(phone))
            .await
            .expect("create user");
        users::link_slack_account(&self.db, &user.id, slack_user_id, Some("T-MOCK"))
            .await
            .expect("link slack");
        users::get_user(&self.db, &user.id)
            .await
            .expect("refetch user")
            .expect("user exists")
    }
}
