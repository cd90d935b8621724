// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the webhook server.
//!
//! Voice handlers always answer with TwiML, even when the request is
//! malformed, so a caller never hears Twilio's generic error message.

use axum::{
    Form, Json,
    extract::{State, rejection::FormRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use parley_core::{mask_phone_number, preview};
use parley_router::{Availability, UsageReport};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::server::GatewayState;

pub const SERVICE_NAME: &str = "Parley Phone Assistant";

/// Answer for a call that could not be set up.
pub const INCOMING_ERROR_TWIML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8"?><Response>"#,
    "<Say>We are experiencing technical difficulties. Please try again later.</Say>",
    "<Hangup/></Response>"
);

/// Answer for a turn that failed; the caller is sent back to speak again.
pub const PROCESS_ERROR_TWIML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8"?><Response>"#,
    "<Say>I apologize, but I encountered an error. Please try again.</Say>",
    r#"<Redirect method="POST">/voice/process</Redirect></Response>"#
);

/// Call statuses after which Twilio sends no more speech for the call.
const TERMINAL_STATUSES: &[&str] = &["completed", "busy", "no-answer", "failed", "canceled"];

/// Wraps a TwiML document in an `application/xml` response.
pub fn xml(body: String) -> Response {
    ([(header::CONTENT_TYPE, "application/xml")], body).into_response()
}

/// Form for POST /voice/incoming.
#[derive(Debug, Deserialize)]
pub struct IncomingCallForm {
    #[serde(rename = "From")]
    pub from: Option<String>,
    #[serde(rename = "CallSid")]
    pub call_sid: Option<String>,
}

/// Form for POST /voice/process.
#[derive(Debug, Deserialize)]
pub struct SpeechForm {
    #[serde(rename = "From")]
    pub from: Option<String>,
    #[serde(rename = "SpeechResult")]
    pub speech_result: Option<String>,
}

/// Form for POST /voice/status.
#[derive(Debug, Deserialize)]
pub struct CallStatusForm {
    #[serde(rename = "CallSid")]
    pub call_sid: Option<String>,
    #[serde(rename = "CallStatus")]
    pub call_status: Option<String>,
    #[serde(rename = "From")]
    pub from: Option<String>,
}

/// Form for POST /sms/incoming.
#[derive(Debug, Deserialize)]
pub struct SmsForm {
    #[serde(rename = "From")]
    pub from: Option<String>,
    #[serde(rename = "Body")]
    pub body: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub components: Components,
    pub availability: Availability,
    pub active_calls: usize,
}

#[derive(Debug, Serialize)]
pub struct Components {
    pub server: &'static str,
    pub phone_number_configured: bool,
    /// Configured backend slots (`local`, `edge`, `cloud`).
    pub backends: Vec<&'static str>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusResponse {
    fn ok(status: &str) -> Json<Self> {
        Json(Self {
            status: status.to_string(),
            message: None,
        })
    }

    fn error(message: &str) -> Json<Self> {
        Json(Self {
            status: "error".to_string(),
            message: Some(message.to_string()),
        })
    }
}

/// GET / - service banner.
pub async fn get_root(State(state): State<GatewayState>) -> Json<RootResponse> {
    Json(RootResponse {
        status: "online",
        service: SERVICE_NAME,
        version: state.health.version,
    })
}

/// GET /health - configured components plus a live availability probe.
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    let availability = state.assistant.availability().await;
    let backends = state.assistant.router().backends().configured_names();
    // Degraded when backends are configured but none answered the probe.
    let status = if !backends.is_empty() && availability.none() {
        "degraded"
    } else {
        "healthy"
    };

    Json(HealthResponse {
        status,
        version: state.health.version,
        uptime_secs: state.health.start_time.elapsed().as_secs(),
        components: Components {
            server: "healthy",
            phone_number_configured: state.health.phone_number_configured,
            backends,
        },
        availability,
        active_calls: state.assistant.active_call_count(),
    })
}

/// GET /usage - per-backend response counters.
pub async fn get_usage(State(state): State<GatewayState>) -> Json<UsageReport> {
    Json(state.assistant.usage_report())
}

/// GET /metrics - Prometheus text exposition.
pub async fn get_metrics(State(state): State<GatewayState>) -> Response {
    match &state.prometheus_render {
        Some(render) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// POST /voice/incoming - a new call rings.
pub async fn post_voice_incoming(
    State(state): State<GatewayState>,
    form: Result<Form<IncomingCallForm>, FormRejection>,
) -> Response {
    let form = match form {
        Ok(Form(form)) => form,
        Err(e) => {
            warn!(error = %e, "malformed incoming call webhook");
            return xml(INCOMING_ERROR_TWIML.to_string());
        }
    };
    let Some(caller) = form.from.filter(|f| !f.trim().is_empty()) else {
        warn!(call_sid = ?form.call_sid, "incoming call without caller number");
        return xml(INCOMING_ERROR_TWIML.to_string());
    };

    info!(
        caller = %mask_phone_number(&caller),
        call_sid = ?form.call_sid,
        "incoming call"
    );
    xml(state.assistant.incoming_call(&caller).await)
}

/// POST /voice/process - Twilio delivers one transcribed utterance.
pub async fn post_voice_process(
    State(state): State<GatewayState>,
    form: Result<Form<SpeechForm>, FormRejection>,
) -> Response {
    let form = match form {
        Ok(Form(form)) => form,
        Err(e) => {
            warn!(error = %e, "malformed speech webhook");
            return xml(PROCESS_ERROR_TWIML.to_string());
        }
    };
    let Some(caller) = form.from.filter(|f| !f.trim().is_empty()) else {
        warn!("speech webhook without caller number");
        return xml(PROCESS_ERROR_TWIML.to_string());
    };
    let speech = form.speech_result.unwrap_or_default();

    debug!(
        caller = %mask_phone_number(&caller),
        speech = %preview(&speech, 50),
        "speech received"
    );
    xml(state.assistant.process_utterance(&caller, &speech).await)
}

/// POST /voice/status - call progress callback.
pub async fn post_voice_status(
    State(state): State<GatewayState>,
    form: Result<Form<CallStatusForm>, FormRejection>,
) -> Json<StatusResponse> {
    let form = match form {
        Ok(Form(form)) => form,
        Err(e) => {
            warn!(error = %e, "malformed status webhook");
            return StatusResponse::ok("received");
        }
    };
    let status = form.call_status.as_deref().unwrap_or_default();
    info!(call_sid = ?form.call_sid, status, "call status update");

    if TERMINAL_STATUSES.contains(&status)
        && let Some(caller) = form.from.as_deref().filter(|f| !f.trim().is_empty())
    {
        if let Some(snapshot) = state.assistant.active_call(caller) {
            debug!(
                caller = %mask_phone_number(caller),
                interactions = snapshot.interactions,
                "closing active call"
            );
        }
        state.assistant.call_ended(caller).await;
    }
    StatusResponse::ok("received")
}

/// POST /sms/incoming - an inbound text message.
pub async fn post_sms_incoming(
    State(state): State<GatewayState>,
    form: Result<Form<SmsForm>, FormRejection>,
) -> Json<StatusResponse> {
    let form = match form {
        Ok(Form(form)) => form,
        Err(e) => {
            warn!(error = %e, "malformed sms webhook");
            return StatusResponse::error("Failed to process message");
        }
    };
    let Some(sender) = form.from.filter(|f| !f.trim().is_empty()) else {
        warn!("sms webhook without sender number");
        return StatusResponse::error("Failed to process message");
    };
    let body = form.body.unwrap_or_default();

    info!(
        sender = %mask_phone_number(&sender),
        body = %preview(&body, 50),
        "sms received"
    );
    match state.assistant.incoming_message(&sender, &body).await {
        Ok(_) => StatusResponse::ok("processed"),
        Err(e) => {
            error!(sender = %mask_phone_number(&sender), error = %e, "sms reply failed");
            StatusResponse::error("Failed to process message")
        }
    }
}
