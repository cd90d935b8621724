// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook authentication middleware.
//!
//! Twilio signs every webhook with `X-Twilio-Signature`: an HMAC of the
//! public URL it called plus the sorted form parameters. Requests whose
//! signature does not verify are rejected with 403 before reaching a
//! handler.

use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use parley_config::model::TwilioConfig;
use parley_twilio::{SIGNATURE_HEADER, validate_signature};
use tracing::{debug, warn};

/// Largest webhook body read for verification.
const MAX_FORM_BYTES: usize = 64 * 1024;

/// Secrets needed to verify webhook signatures.
#[derive(Clone)]
pub struct SignatureConfig {
    pub auth_token: String,
    /// Externally visible base URL (e.g. `https://voice.example.com`).
    pub public_url: String,
}

impl SignatureConfig {
    /// Some when `twilio.validate_requests` is on and the token and public
    /// URL are both set.
    pub fn from_config(twilio: &TwilioConfig) -> Option<Self> {
        if !twilio.validate_requests {
            return None;
        }
        Some(Self {
            auth_token: twilio.auth_token.clone()?,
            public_url: twilio.public_url.clone()?,
        })
    }

    fn url_for(&self, path_and_query: &str) -> String {
        format!("{}{path_and_query}", self.public_url.trim_end_matches('/'))
    }
}

impl std::fmt::Debug for SignatureConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureConfig")
            .field("auth_token", &"[redacted]")
            .field("public_url", &self.public_url)
            .finish()
    }
}

/// Rejects webhooks whose `X-Twilio-Signature` does not match.
///
/// The form body is buffered for verification and handed on unchanged.
pub async fn signature_middleware(
    State(config): State<SignatureConfig>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(signature) = request
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
    else {
        warn!(path = %request.uri().path(), "webhook without signature rejected");
        return Err(StatusCode::FORBIDDEN);
    };

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_FORM_BYTES)
        .await
        .map_err(|_| StatusCode::PAYLOAD_TOO_LARGE)?;
    let params: Vec<(String, String)> =
        serde_urlencoded::from_bytes(&bytes).map_err(|_| StatusCode::BAD_REQUEST)?;

    let path = parts
        .uri
        .path_and_query()
        .map(|p| p.as_str())
        .unwrap_or("/");
    let url = config.url_for(path);

    if !validate_signature(&config.auth_token, &url, &params, &signature) {
        warn!(path = %parts.uri.path(), "invalid Twilio signature, possible spoofed request");
        return Err(StatusCode::FORBIDDEN);
    }
    debug!(path = %parts.uri.path(), "webhook signature verified");

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn twilio(validate: bool) -> TwilioConfig {
        TwilioConfig {
            auth_token: Some("tw-secret".into()),
            public_url: Some("https://voice.example.com/".into()),
            validate_requests: validate,
            ..TwilioConfig::default()
        }
    }

    #[test]
    fn disabled_validation_yields_none() {
        assert!(SignatureConfig::from_config(&twilio(false)).is_none());
    }

    #[test]
    fn enabled_validation_needs_token_and_url() {
        let config = SignatureConfig::from_config(&twilio(true)).unwrap();
        assert_eq!(config.url_for("/voice/process"), "https://voice.example.com/voice/process");

        let mut missing = twilio(true);
        missing.public_url = None;
        assert!(SignatureConfig::from_config(&missing).is_none());
    }

    #[test]
    fn debug_redacts_token() {
        let config = SignatureConfig::from_config(&twilio(true)).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("tw-secret"));
        assert!(debug.contains("[redacted]"));
    }
}
