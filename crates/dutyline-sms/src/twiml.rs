// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Minimal TwiML rendering for webhook replies.

/// Render a single-message TwiML response.
pub fn message_response(message: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>{}</Message></Response>",
        escape_xml(message)
    )
}

/// Render an empty TwiML response (acknowledge without replying).
pub fn empty_response() -> String {
    "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response></Response>".to_string()
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_message_body() {
        let twiml = message_response("Response recorded.");
        assert_eq!(
            twiml,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>Response recorded.</Message></Response>"
        );
    }

    #[test]
    fn escapes_xml_metacharacters() {
        let twiml = message_response("Selected: <Fix & ship>");
        assert!(twiml.contains("&lt;Fix &amp; ship&gt;"));
        assert!(!twiml.contains("<Fix"));
    }

    #[test]
    fn empty_response_has_no_message() {
        assert!(!empty_response().contains("<Message>"));
    }
}
