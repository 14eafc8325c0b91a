// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Twilio inbound SMS webhook.
//!
//! Form-encoded POST carrying the sender number and body text. The reply is
//! TwiML, so the human always gets feedback in the same SMS conversation.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use dutyline_core::{Channel, DutylineError};
use dutyline_dispatch::{parser, record};
use dutyline_storage::queries::users;
use dutyline_sms::twiml;

use crate::server::GatewayState;

fn twiml_response(message: &str) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/xml")],
        twiml::message_response(message),
    )
        .into_response()
}

fn empty_twiml() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/xml")],
        twiml::empty_response(),
    )
        .into_response()
}

/// Reconstruct the public URL Twilio signed, trusting proxy headers for the
/// scheme.
fn request_url(headers: &HeaderMap) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("https");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    format!("{scheme}://{host}/webhooks/twilio/sms")
}

fn form_value<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

/// POST /webhooks/twilio/sms
pub async fn handle_inbound_sms(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let params: Vec<(String, String)> = match serde_urlencoded::from_str(&body) {
        Ok(params) => params,
        Err(e) => {
            warn!(error = %e, "malformed twilio form body");
            return empty_twiml();
        }
    };

    if let Some(token) = state.twilio_auth_token.as_deref() {
        let signature = headers
            .get("x-twilio-signature")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !dutyline_sms::verify_signature(token, &request_url(&headers), &params, signature) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }

    let from = form_value(&params, "From").unwrap_or_default().to_string();
    let text = form_value(&params, "Body").unwrap_or_default().trim().to_string();
    let message_sid = form_value(&params, "MessageSid").map(|s| s.to_string());

    match process_inbound(&state, &from, &text, message_sid.as_deref()).await {
        Ok(reply) => match reply {
            Some(message) => twiml_response(&message),
            None => empty_twiml(),
        },
        Err(e) => {
            // Absorb internal failures; Twilio retries on errors.
            error!(error = %e, "twilio inbound handling failed");
            empty_twiml()
        }
    }
}

/// Resolve the sender and parse the reply. Returns the TwiML message text.
async fn process_inbound(
    state: &GatewayState,
    from: &str,
    text: &str,
    message_sid: Option<&str>,
) -> Result<Option<String>, DutylineError> {
    let Some(user) = users::get_user_by_phone(&state.db, from).await? else {
        return Ok(Some(
            "Unknown phone number. Please register your phone in Dutyline.".to_string(),
        ));
    };

    if text.is_empty() {
        return Ok(None);
    }

    let reply = match parser::parse_inbound(&state.db, text, &user.id).await? {
        parser::Intent::ShortCodeReply { notification, text } => {
            record::record_response(
                &state.db,
                &notification,
                &user.id,
                Channel::Sms,
                Some(&text),
                None,
                message_sid,
            )
            .await?;
            "Response recorded.".to_string()
        }
        parser::Intent::OptionSelected {
            notification,
            option,
        } => {
            record::record_response(
                &state.db,
                &notification,
                &user.id,
                Channel::Sms,
                None,
                Some(&option),
                message_sid,
            )
            .await?;
            format!("Selected: {option}")
        }
        parser::Intent::FreeformReply { notification, text } => {
            record::record_response(
                &state.db,
                &notification,
                &user.id,
                Channel::Sms,
                Some(&text),
                None,
                message_sid,
            )
            .await?;
            "Response recorded.".to_string()
        }
        parser::Intent::InvalidOption => "Invalid option number.".to_string(),
        parser::Intent::NotFound { short_code } => {
            format!("No active notification found with code {short_code}.")
        }
        parser::Intent::NoActiveTarget => "No active notification to respond to.".to_string(),
    };
    Ok(Some(reply))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_url_prefers_forwarded_proto() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "dutyline.example.com".parse().unwrap());
        headers.insert("x-forwarded-proto", "https".parse().unwrap());
        assert_eq!(
            request_url(&headers),
            "https://dutyline.example.com/webhooks/twilio/sms"
        );
    }

    #[test]
    fn form_value_finds_fields() {
        let params = vec![
            ("From".to_string(), "+15550001111".to_string()),
            ("Body".to_string(), "2".to_string()),
        ];
        assert_eq!(form_value(&params, "From"), Some("+15550001111"));
        assert_eq!(form_value(&params, "Body"), Some("2"));
        assert_eq!(form_value(&params, "MessageSid"), None);
    }
}
