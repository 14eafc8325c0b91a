// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Block Kit rendering for notification messages and the response modal.
//!
//! Button action ids encode the notification so interaction callbacks can
//! resolve it without a session: `respond_<notification_id>_<index>` for a
//! suggested answer and `respond_<notification_id>_other` for the free-text
//! escape hatch.

use serde_json::{json, Value};

/// Fallback text shown in push previews and clients without Block Kit.
pub fn notification_text(short_code: &str, message: &str) -> String {
    format!("[{short_code}] {message}")
}

/// Render a notification as Block Kit blocks.
///
/// With options, each suggested answer becomes a button, followed by an
/// "Other..." button that opens the free-text modal.
pub fn notification_blocks(
    short_code: &str,
    message: &str,
    options: &[String],
    notification_id: &str,
) -> Value {
    let mut blocks = vec![json!({
        "type": "section",
        "text": {
            "type": "mrkdwn",
            "text": format!("*[{short_code}]* {message}"),
        },
    })];

    if !options.is_empty() {
        let mut buttons: Vec<Value> = options
            .iter()
            .enumerate()
            .map(|(index, option)| {
                json!({
                    "type": "button",
                    "text": { "type": "plain_text", "text": option, "emoji": true },
                    "value": option,
                    "action_id": format!("respond_{notification_id}_{index}"),
                })
            })
            .collect();

        buttons.push(json!({
            "type": "button",
            "text": { "type": "plain_text", "text": "Other...", "emoji": true },
            "value": "__other__",
            "action_id": format!("respond_{notification_id}_other"),
        }));

        blocks.push(json!({ "type": "actions", "elements": buttons }));
    }

    Value::Array(blocks)
}

/// Render the replacement blocks for an answered notification: the original
/// section with the chosen answer appended, and no buttons.
pub fn answered_blocks(short_code: &str, message: &str, chosen: &str) -> Value {
    json!([
        {
            "type": "section",
            "text": {
                "type": "mrkdwn",
                "text": format!("*[{short_code}]* {message}"),
            },
        },
        {
            "type": "context",
            "elements": [
                { "type": "mrkdwn", "text": format!("✓ {chosen}") },
            ],
        },
    ])
}

/// Render the custom response modal view.
///
/// `private_metadata` is echoed back verbatim in the `view_submission`
/// callback; callers stash the notification id and original message
/// coordinates there.
pub fn response_modal(private_metadata: &str, short_code: &str, message: &str) -> Value {
    json!({
        "type": "modal",
        "callback_id": "respond_modal",
        "private_metadata": private_metadata,
        "title": { "type": "plain_text", "text": "Custom Response" },
        "submit": { "type": "plain_text", "text": "Send" },
        "blocks": [
            {
                "type": "section",
                "text": {
                    "type": "mrkdwn",
                    "text": format!("*[{short_code}]* {message}"),
                },
            },
            {
                "type": "input",
                "block_id": "response_block",
                "element": {
                    "type": "plain_text_input",
                    "action_id": "response_text",
                    "multiline": true,
                    "placeholder": { "type": "plain_text", "text": "Type your response..." },
                },
                "label": { "type": "plain_text", "text": "Your response" },
            },
        ],
    })
}
