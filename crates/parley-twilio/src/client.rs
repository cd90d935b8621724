// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Minimal Twilio REST client: send SMS, place calls, fetch call status.

use std::time::Duration;

use parley_core::{ParleyError, mask_phone_number};
use serde::Deserialize;
use tracing::{debug, info};

const API_BASE_URL: &str = "https://api.twilio.com/2010-04-01";

/// Resource returned by the Messages and Calls endpoints.
#[derive(Debug, Clone, Deserialize)]
struct ResourceSid {
    sid: String,
}

/// Error body returned on 4xx/5xx.
#[derive(Debug, Clone, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<u32>,
    #[serde(default)]
    message: String,
}

/// Snapshot of a call as reported by the Calls endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CallStatus {
    pub sid: String,
    pub status: String,
    /// Seconds, as a string; absent until the call finishes.
    #[serde(default)]
    pub duration: Option<String>,
    pub from: String,
    pub to: String,
}

/// Basic-auth REST client bound to one account and sending number.
#[derive(Debug, Clone)]
pub struct TwilioClient {
    http: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
    base_url: String,
}

impl TwilioClient {
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        from_number: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ParleyError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ParleyError::Telephony {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            http,
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            from_number: from_number.into(),
            base_url: API_BASE_URL.to_string(),
        })
    }

    /// Points the client at another API root (wiremock in tests).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn from_number(&self) -> &str {
        &self.from_number
    }

    fn account_url(&self, resource: &str) -> String {
        format!("{}/Accounts/{}/{resource}", self.base_url, self.account_sid)
    }

    /// Sends an SMS and returns its message SID.
    pub async fn send_message(&self, to: &str, body: &str) -> Result<String, ParleyError> {
        let form = [("To", to), ("From", self.from_number.as_str()), ("Body", body)];
        let sid = self.post_form("Messages.json", &form).await?;
        info!(to = %mask_phone_number(to), sid = %sid, "SMS sent");
        Ok(sid)
    }

    /// Places a call that plays `twiml` and returns its call SID.
    pub async fn make_call(
        &self,
        to: &str,
        twiml: &str,
        status_callback: Option<&str>,
    ) -> Result<String, ParleyError> {
        let mut form = vec![("To", to), ("From", self.from_number.as_str()), ("Twiml", twiml)];
        if let Some(url) = status_callback {
            form.push(("StatusCallback", url));
        }
        let sid = self.post_form("Calls.json", &form).await?;
        info!(to = %mask_phone_number(to), sid = %sid, "call initiated");
        Ok(sid)
    }

    /// Fetches the current state of a call.
    pub async fn call_status(&self, call_sid: &str) -> Result<CallStatus, ParleyError> {
        let response = self
            .http
            .get(self.account_url(&format!("Calls/{call_sid}.json")))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .send()
            .await
            .map_err(|e| transport_error(e, "call status request failed"))?;
        parse_json(response).await
    }

    async fn post_form(&self, resource: &str, form: &[(&str, &str)]) -> Result<String, ParleyError> {
        let response = self
            .http
            .post(self.account_url(resource))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(form)
            .send()
            .await
            .map_err(|e| transport_error(e, "Twilio request failed"))?;
        debug!(status = %response.status(), resource, "Twilio response received");
        let created: ResourceSid = parse_json(response).await?;
        Ok(created.sid)
    }
}

async fn parse_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ParleyError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| transport_error(e, "failed to read Twilio response"))?;

    if !status.is_success() {
        let message = match serde_json::from_str::<ApiError>(&body) {
            Ok(ApiError {
                code: Some(code),
                message,
            }) => format!("Twilio API error {code}: {message}"),
            Ok(ApiError { code: None, message }) if !message.is_empty() => {
                format!("Twilio API returned {status}: {message}")
            }
            _ => format!("Twilio API returned {status}: {body}"),
        };
        return Err(ParleyError::Telephony {
            message,
            source: None,
        });
    }

    serde_json::from_str(&body).map_err(|e| ParleyError::Telephony {
        message: format!("failed to parse Twilio response: {e}"),
        source: Some(Box::new(e)),
    })
}

fn transport_error(err: reqwest::Error, context: &str) -> ParleyError {
    ParleyError::Telephony {
        message: format!("{context}: {err}"),
        source: Some(Box::new(err)),
    }
}
