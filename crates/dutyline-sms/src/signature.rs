// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Twilio request signature verification (`X-Twilio-Signature`).
//!
//! Twilio signs each webhook POST with
//! `base64(hmac_sha1(auth_token, url + concat(sorted form params as name+value)))`.

use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Verify a Twilio webhook signature.
///
/// `url` must be the full public URL Twilio posted to, including scheme and
/// query string; `params` are the decoded form fields.
pub fn verify_signature(
    auth_token: &str,
    url: &str,
    params: &[(String, String)],
    signature_header: &str,
) -> bool {
    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut payload = url.to_string();
    for (name, value) in sorted {
        payload.push_str(name);
        payload.push_str(value);
    }

    let mut mac = HmacSha1::new_from_slice(auth_token.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(payload.as_bytes());

    let Ok(expected) = base64::engine::general_purpose::STANDARD.decode(signature_header) else {
        return false;
    };
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "12345";
    const URL: &str = "https://mycompany.com/myapp.php?foo=1&bar=2";

    fn sign(token: &str, url: &str, params: &[(String, String)]) -> String {
        let mut sorted: Vec<&(String, String)> = params.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        let mut payload = url.to_string();
        for (name, value) in sorted {
            payload.push_str(name);
            payload.push_str(value);
        }
        let mut mac = HmacSha1::new_from_slice(token.as_bytes()).unwrap();
        mac.update(payload.as_bytes());
        base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
    }

    fn sample_params() -> Vec<(String, String)> {
        vec![
            ("From".to_string(), "+14158675309".to_string()),
            ("Body".to_string(), "ABC ship it".to_string()),
            ("MessageSid".to_string(), "SM42".to_string()),
        ]
    }

    #[test]
    fn valid_signature_verifies() {
        let params = sample_params();
        let signature = sign(TOKEN, URL, &params);
        assert!(verify_signature(TOKEN, URL, &params, &signature));
    }

    #[test]
    fn parameter_order_does_not_matter() {
        let mut params = sample_params();
        let signature = sign(TOKEN, URL, &params);
        params.reverse();
        assert!(verify_signature(TOKEN, URL, &params, &signature));
    }

    #[test]
    fn wrong_token_or_tampered_body_is_rejected() {
        let params = sample_params();
        let signature = sign(TOKEN, URL, &params);
        assert!(!verify_signature("other-token", URL, &params, &signature));

        let mut tampered = sample_params();
        tampered[1].1 = "XYZ ship it".to_string();
        assert!(!verify_signature(TOKEN, URL, &tampered, &signature));
    }

    #[test]
    fn garbage_signature_is_rejected() {
        assert!(!verify_signature(TOKEN, URL, &sample_params(), "!!not-base64!!"));
    }
}
