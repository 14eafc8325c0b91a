// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Short code generation.
//!
//! Codes are 3 characters from `A-Z0-9`, human-typeable over SMS. Uniqueness
//! is scoped to *active* notifications: a code frees up once its
//! notification reaches a terminal status, and the active-only lookup on the
//! inbound path guarantees a stale code can never resolve to a finished
//! request.

use dutyline_core::DutylineError;
use dutyline_storage::queries::notifications;
use dutyline_storage::Database;
use rand::Rng;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_LEN: usize = 3;

/// With 36^3 = 46656 codes, a handful of retries is enough for any
/// realistic number of concurrently active notifications.
const MAX_ATTEMPTS: usize = 32;

/// Generate a random 3-character code (no uniqueness check).
pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Allocate a code that does not collide with any active notification.
pub async fn allocate_code(db: &Database) -> Result<String, DutylineError> {
    for _ in 0..MAX_ATTEMPTS {
        let code = generate_code();
        if !notifications::short_code_in_active_use(db, &code).await? {
            return Ok(code);
        }
    }
    Err(DutylineError::Internal(
        "could not allocate a free short code; too many active notifications".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_use_the_uppercase_alphanumeric_alphabet() {
        for _ in 0..200 {
            let code = generate_code();
            assert_eq!(code.len(), 3);
            assert!(code
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn allocation_skips_active_codes() {
        let harness = dutyline_test_utils::TestHarness::new().await;
        let user = harness.user("dev@example.com").await;

        // Occupy one code and verify allocation still succeeds and never
        // returns the occupied one while it is active.
        notifications::create_notification(
            &harness.db,
            notifications::NewNotification {
                short_code: "AAA".into(),
                user_id: user.id,
                session_id: None,
                message: "m".into(),
                priority: 3,
                context: None,
                tags: vec![],
                options: vec![],
                policy_id: None,
            },
        )
        .await
        .unwrap();

        for _ in 0..20 {
            let code = allocate_code(&harness.db).await.unwrap();
            assert_ne!(code, "AAA");
        }
    }
}
