// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer token authentication middleware for the REST API.
//!
//! When no token is configured, all API requests are rejected (fail-closed).
//! Webhook routes are not behind this middleware; they authenticate by
//! provider signature instead.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};

/// Authentication configuration for the REST API.
#[derive(Clone)]
pub struct AuthConfig {
    /// Expected bearer token. `None` disables the API entirely.
    pub bearer_token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

/// Middleware validating `Authorization: Bearer <token>`.
pub async fn auth_middleware(
    State(auth): State<AuthConfig>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(ref expected_token) = auth.bearer_token else {
        tracing::error!("gateway API has no auth token configured; rejecting request");
        return Err(StatusCode::UNAUTHORIZED);
    };

    let provided = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match provided {
        Some(token) if token == expected_token => Ok(next.run(request).await),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_the_token() {
        let config = AuthConfig {
            bearer_token: Some("dl-secret".to_string()),
        };
        let output = format!("{config:?}");
        assert!(!output.contains("dl-secret"));
        assert!(output.contains("[redacted]"));
    }
}
