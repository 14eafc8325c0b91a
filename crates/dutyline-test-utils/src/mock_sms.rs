// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock SMS transport for deterministic testing.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use dutyline_core::{DutylineError, SmsTransport};

/// A mock SMS transport capturing every send as `(to, body)`.
#[derive(Default)]
pub struct MockSms {
    sent: Mutex<Vec<(String, String)>>,
    counter: AtomicU64,
    failing: AtomicBool,
}

impl MockSms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following send fail with a channel error.
    pub fn fail_next_sends(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// All messages sent so far.
    pub async fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl SmsTransport for MockSms {
    async fn send(&self, to: &str, body: &str) -> Result<String, DutylineError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DutylineError::Channel {
                message: "mock sms send failure".to_string(),
                source: None,
            });
        }
        self.sent
            .lock()
            .await
            .push((to.to_string(), body.to_string()));
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(format!("SM-MOCK-{n}"))
    }
}
