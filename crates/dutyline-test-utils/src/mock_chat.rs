// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock chat transport for deterministic testing.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use dutyline_core::{ChatPost, ChatTransport, DutylineError, PostedMessage};

/// Owned snapshot of a [`ChatPost`] captured by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedChatPost {
    pub target: String,
    pub short_code: String,
    pub message: String,
    pub options: Vec<String>,
    pub notification_id: String,
    pub thread_ts: Option<String>,
}

/// Captured `update_notification` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpdate {
    pub channel_id: String,
    pub ts: String,
    pub chosen: String,
}

/// A mock chat transport.
///
/// Captures every posted message for assertion and hands out deterministic
/// message identifiers (`1719000000.0000NN` in channel `D-MOCK`). Calling
/// [`MockChat::fail_next_sends`] makes subsequent sends error, exercising
/// failed-delivery paths.
#[derive(Default)]
pub struct MockChat {
    posts: Mutex<Vec<RecordedChatPost>>,
    texts: Mutex<Vec<(String, String, Option<String>)>>,
    updates: Mutex<Vec<RecordedUpdate>>,
    modals: Mutex<Vec<(String, String)>>,
    counter: AtomicU64,
    failing: AtomicBool,
}

impl MockChat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following send fail with a channel error.
    pub fn fail_next_sends(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// All notification posts so far.
    pub async fn posts(&self) -> Vec<RecordedChatPost> {
        self.posts.lock().await.clone()
    }

    /// All plain-text posts so far, as `(target, text, thread_ts)`.
    pub async fn texts(&self) -> Vec<(String, String, Option<String>)> {
        self.texts.lock().await.clone()
    }

    /// All message updates so far.
    pub async fn updates(&self) -> Vec<RecordedUpdate> {
        self.updates.lock().await.clone()
    }

    /// All opened modals so far, as `(trigger_id, private_metadata)`.
    pub async fn modals(&self) -> Vec<(String, String)> {
        self.modals.lock().await.clone()
    }

    fn next_message(&self) -> PostedMessage {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        PostedMessage {
            ts: format!("1719000000.{n:06}"),
            channel_id: "D-MOCK".to_string(),
        }
    }

    fn check_failing(&self) -> Result<(), DutylineError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(DutylineError::Channel {
                message: "mock chat send failure".to_string(),
                source: None,
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ChatTransport for MockChat {
    async fn post_notification(&self, post: ChatPost<'_>) -> Result<PostedMessage, DutylineError> {
        self.check_failing()?;
        self.posts.lock().await.push(RecordedChatPost {
            target: post.target.to_string(),
            short_code: post.short_code.to_string(),
            message: post.message.to_string(),
            options: post.options.to_vec(),
            notification_id: post.notification_id.to_string(),
            thread_ts: post.thread_ts.map(|s| s.to_string()),
        });
        Ok(self.next_message())
    }

    async fn post_text(
        &self,
        target: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<PostedMessage, DutylineError> {
        self.check_failing()?;
        self.texts.lock().await.push((
            target.to_string(),
            text.to_string(),
            thread_ts.map(|s| s.to_string()),
        ));
        Ok(self.next_message())
    }

    async fn update_notification(
        &self,
        channel_id: &str,
        ts: &str,
        _short_code: &str,
        _message: &str,
        chosen: &str,
    ) -> Result<(), DutylineError> {
        self.check_failing()?;
        self.updates.lock().await.push(RecordedUpdate {
            channel_id: channel_id.to_string(),
            ts: ts.to_string(),
            chosen: chosen.to_string(),
        });
        Ok(())
    }

    async fn open_response_modal(
        &self,
        trigger_id: &str,
        private_metadata: &str,
        _short_code: &str,
        _message: &str,
    ) -> Result<(), DutylineError> {
        self.check_failing()?;
        self.modals
            .lock()
            .await
            .push((trigger_id.to_string(), private_metadata.to_string()));
        Ok(())
    }
}
