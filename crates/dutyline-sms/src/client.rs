// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Twilio Messages API client implementing the SMS transport.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use dutyline_core::{DutylineError, SmsTransport};

const DEFAULT_API_BASE: &str = "https://api.twilio.com";

/// Twilio REST API client.
pub struct TwilioClient {
    http: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct TwilioError {
    message: Option<String>,
}

impl TwilioClient {
    /// Create a client with the default API base URL.
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        from_number: impl Into<String>,
    ) -> Self {
        Self::with_api_base(account_sid, auth_token, from_number, DEFAULT_API_BASE)
    }

    /// Create a client against a custom API base URL (testing).
    pub fn with_api_base(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        from_number: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            from_number: from_number.into(),
            api_base: api_base.into(),
        }
    }
}

#[async_trait]
impl SmsTransport for TwilioClient {
    async fn send(&self, to: &str, body: &str) -> Result<String, DutylineError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, self.account_sid
        );
        let params = [("To", to), ("From", self.from_number.as_str()), ("Body", body)];

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| DutylineError::channel("twilio send request failed", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response
                .json::<TwilioError>()
                .await
                .ok()
                .and_then(|e| e.message)
                .unwrap_or_default();
            return Err(DutylineError::Channel {
                message: format!("twilio send failed with {status}: {detail}"),
                source: None,
            });
        }

        let message: MessageResponse = response
            .json()
            .await
            .map_err(|e| DutylineError::channel("twilio send returned non-JSON", e))?;

        debug!(sid = %message.sid, "sent SMS");
        Ok(message.sid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn send_posts_form_and_returns_sid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
            .and(body_string_contains("To=%2B15550001111"))
            .and(body_string_contains("From=%2B15559990000"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "sid": "SM42",
                "status": "queued",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = TwilioClient::with_api_base("AC123", "token", "+15559990000", server.uri());
        let sid = client.send("+15550001111", "[ABC] Deploy?").await.unwrap();
        assert_eq!(sid, "SM42");
    }

    #[tokio::test]
    async fn api_errors_surface_as_channel_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "code": 21211,
                "message": "Invalid 'To' phone number",
            })))
            .mount(&server)
            .await;

        let client = TwilioClient::with_api_base("AC123", "token", "+15559990000", server.uri());
        let err = client.send("bogus", "hello").await.unwrap_err();
        assert!(err.to_string().contains("Invalid 'To' phone number"));
    }
}
