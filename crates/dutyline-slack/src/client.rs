// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slack Web API client implementing the chat transport.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use dutyline_core::{ChatPost, ChatTransport, DutylineError, PostedMessage};

use crate::blocks;

const DEFAULT_API_BASE: &str = "https://slack.com/api";

/// Slack Web API client.
pub struct SlackClient {
    http: reqwest::Client,
    bot_token: String,
    api_base: String,
}

/// Envelope every Web API method responds with.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    error: Option<String>,
    ts: Option<String>,
    channel: Option<String>,
}

impl SlackClient {
    /// Create a client with the default API base URL.
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self::with_api_base(bot_token, DEFAULT_API_BASE)
    }

    /// Create a client against a custom API base URL (testing).
    pub fn with_api_base(bot_token: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            bot_token: bot_token.into(),
            api_base: api_base.into(),
        }
    }

    /// Call a Web API method with a JSON body and check the `ok` envelope.
    async fn call(&self, method: &str, body: Value) -> Result<ApiResponse, DutylineError> {
        let url = format!("{}/{method}", self.api_base);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.bot_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| DutylineError::channel(format!("slack {method} request failed"), e))?;

        let api: ApiResponse = response
            .json()
            .await
            .map_err(|e| DutylineError::channel(format!("slack {method} returned non-JSON"), e))?;

        if !api.ok {
            return Err(DutylineError::Channel {
                message: format!(
                    "slack {method} error: {}",
                    api.error.as_deref().unwrap_or("unknown")
                ),
                source: None,
            });
        }
        Ok(api)
    }
}

#[async_trait]
impl ChatTransport for SlackClient {
    async fn post_notification(&self, post: ChatPost<'_>) -> Result<PostedMessage, DutylineError> {
        let mut body = json!({
            "channel": post.target,
            "text": blocks::notification_text(post.short_code, post.message),
            "blocks": blocks::notification_blocks(
                post.short_code,
                post.message,
                post.options,
                post.notification_id,
            ),
        });
        if let Some(thread_ts) = post.thread_ts {
            body["thread_ts"] = json!(thread_ts);
        }

        let api = self.call("chat.postMessage", body).await?;
        let ts = api.ts.ok_or_else(|| DutylineError::Channel {
            message: "slack chat.postMessage response missing ts".to_string(),
            source: None,
        })?;
        let channel_id = api.channel.ok_or_else(|| DutylineError::Channel {
            message: "slack chat.postMessage response missing channel".to_string(),
            source: None,
        })?;

        debug!(%ts, channel = %channel_id, "posted notification message");
        Ok(PostedMessage { ts, channel_id })
    }

    async fn post_text(
        &self,
        target: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<PostedMessage, DutylineError> {
        let mut body = json!({ "channel": target, "text": text });
        if let Some(thread_ts) = thread_ts {
            body["thread_ts"] = json!(thread_ts);
        }

        let api = self.call("chat.postMessage", body).await?;
        Ok(PostedMessage {
            ts: api.ts.unwrap_or_default(),
            channel_id: api.channel.unwrap_or_else(|| target.to_string()),
        })
    }

    async fn update_notification(
        &self,
        channel_id: &str,
        ts: &str,
        short_code: &str,
        message: &str,
        chosen: &str,
    ) -> Result<(), DutylineError> {
        let body = json!({
            "channel": channel_id,
            "ts": ts,
            "text": format!("[{short_code}] {message} ({chosen})"),
            "blocks": blocks::answered_blocks(short_code, message, chosen),
        });
        self.call("chat.update", body).await?;
        Ok(())
    }

    async fn open_response_modal(
        &self,
        trigger_id: &str,
        private_metadata: &str,
        short_code: &str,
        message: &str,
    ) -> Result<(), DutylineError> {
        let body = json!({
            "trigger_id": trigger_id,
            "view": blocks::response_modal(private_metadata, short_code, message),
        });
        self.call("views.open", body).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn post_notification_returns_message_identifiers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .and(body_partial_json(json!({ "channel": "U123" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "ts": "1719000000.000100",
                "channel": "D042",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = SlackClient::with_api_base("xoxb-test", server.uri());
        let posted = client
            .post_notification(ChatPost {
                target: "U123",
                short_code: "ABC",
                message: "Deploy?",
                options: &["Yes".to_string()],
                notification_id: "n-1",
                thread_ts: None,
            })
            .await
            .unwrap();

        assert_eq!(posted.ts, "1719000000.000100");
        assert_eq!(posted.channel_id, "D042");
    }

    #[tokio::test]
    async fn thread_ts_is_forwarded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .and(body_partial_json(json!({ "thread_ts": "1719.0001" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true, "ts": "1719.0002", "channel": "D042",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = SlackClient::with_api_base("xoxb-test", server.uri());
        client
            .post_text("U123", "header", Some("1719.0001"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn api_level_errors_become_channel_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": false, "error": "channel_not_found",
            })))
            .mount(&server)
            .await;

        let client = SlackClient::with_api_base("xoxb-test", server.uri());
        let err = client.post_text("U404", "hello", None).await.unwrap_err();
        assert!(err.to_string().contains("channel_not_found"));
    }

    #[tokio::test]
    async fn update_notification_hits_chat_update() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.update"))
            .and(body_partial_json(json!({ "channel": "D042", "ts": "1719.0001" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(1)
            .mount(&server)
            .await;

        let client = SlackClient::with_api_base("xoxb-test", server.uri());
        client
            .update_notification("D042", "1719.0001", "ABC", "Deploy?", "Yes")
            .await
            .unwrap();
    }
}
