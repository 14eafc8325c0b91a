// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slack request signature verification (signing secret, v0 scheme).
//!
//! Slack signs each webhook request with
//! `v0=hex(hmac_sha256(secret, "v0:{timestamp}:{body}"))` and sends the
//! timestamp alongside. Requests older than five minutes are rejected to
//! block replays.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Maximum accepted age of a signed request, in seconds.
const MAX_AGE_SECS: i64 = 300;

/// Verify a Slack webhook signature against the current clock.
pub fn verify_signature(
    signing_secret: &str,
    timestamp_header: &str,
    body: &str,
    signature_header: &str,
) -> bool {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    verify_signature_at(signing_secret, timestamp_header, body, signature_header, now)
}

/// Clock-injected verification core.
pub fn verify_signature_at(
    signing_secret: &str,
    timestamp_header: &str,
    body: &str,
    signature_header: &str,
    now_unix: i64,
) -> bool {
    let Ok(timestamp) = timestamp_header.parse::<i64>() else {
        return false;
    };
    if (now_unix - timestamp).abs() > MAX_AGE_SECS {
        return false;
    }

    let Some(signature_hex) = signature_header.strip_prefix("v0=") else {
        return false;
    };
    let Ok(signature) = hex::decode(signature_hex) else {
        return false;
    };

    let mut mac = HmacSha256::new_from_slice(signing_secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(format!("v0:{timestamp_header}:{body}").as_bytes());
    mac.verify_slice(&signature).is_ok()
}
