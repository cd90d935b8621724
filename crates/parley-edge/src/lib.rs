// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Edge gateway backend adapter for the Parley phone assistant.
//!
//! The gateway exposes an OpenAI-compatible `/v1/chat/completions` endpoint
//! in front of edge-hosted models, with `"auto"` as a model id that lets
//! the gateway choose. Requests are tagged with an `X-Project` header.
//! Like the local tier, failures yield an empty reply so the router can
//! fall back.

pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use parley_config::ParleyConfig;
use parley_core::{
    BackendAdapter, BackendKind, ChatRequest, HealthStatus, ParleyError, TranscriptStore,
};
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, info};

use crate::types::{CompletionRequest, CompletionResponse, GatewayHealth, GatewayMessage};

const TEMPERATURE: f32 = 0.7;

/// Edge backend over an OpenAI-compatible AI gateway.
pub struct EdgeAdapter {
    client: reqwest::Client,
    base_url: String,
    default_model: String,
    fast_model: String,
    request_timeout: Duration,
    probe_timeout: Duration,
    transcripts: TranscriptStore,
}

impl EdgeAdapter {
    pub fn new(config: &ParleyConfig) -> Result<Self, ParleyError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-project",
            HeaderValue::from_str(&config.edge.project).map_err(|e| {
                ParleyError::Config(format!("invalid edge.project header value: {e}"))
            })?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ParleyError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        let base_url = config.edge.url.trim_end_matches('/').to_string();
        info!(
            url = %base_url,
            model = %config.edge.default_model,
            project = %config.edge.project,
            "edge gateway backend initialized"
        );

        Ok(Self {
            client,
            base_url,
            default_model: config.edge.default_model.clone(),
            fast_model: config.edge.fast_model.clone(),
            request_timeout: Duration::from_secs(config.routing.request_timeout_secs),
            probe_timeout: Duration::from_secs(config.routing.probe_timeout_secs),
            transcripts: TranscriptStore::new(config.routing.max_history),
        })
    }

    fn completion_request(&self, request: ChatRequest) -> CompletionRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(GatewayMessage {
            role: "system".into(),
            content: request.system,
        });
        messages.extend(request.messages.into_iter().map(|turn| GatewayMessage {
            role: turn.role.to_string(),
            content: turn.content,
        }));

        CompletionRequest {
            model: request.model.unwrap_or_else(|| self.default_model.clone()),
            messages,
            max_tokens: request.max_tokens,
            temperature: TEMPERATURE,
        }
    }

    fn transport_error(&self, err: reqwest::Error, timeout: Duration) -> ParleyError {
        if err.is_timeout() {
            ParleyError::Timeout { duration: timeout }
        } else {
            ParleyError::from_http(err, "edge gateway request failed")
        }
    }
}

#[async_trait]
impl BackendAdapter for EdgeAdapter {
    fn name(&self) -> &str {
        "edge"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Edge
    }

    /// Healthy only when `GET /health` answers 200 with `{"status": "healthy"}`.
    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e, self.probe_timeout))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Ok(HealthStatus::Unhealthy(format!("/health returned {status}")));
        }

        let body: GatewayHealth = response
            .json()
            .await
            .map_err(|e| self.transport_error(e, self.probe_timeout))?;
        if body.status == "healthy" {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy(format!(
                "gateway reports status {:?}",
                body.status
            )))
        }
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, ParleyError> {
        let payload = self.completion_request(request);
        debug!(model = %payload.model, messages = payload.messages.len(), "sending edge completion");

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .timeout(self.request_timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.transport_error(e, self.request_timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ParleyError::Provider {
                message: format!("edge gateway returned {status}: {body}"),
                source: None,
            });
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| self.transport_error(e, self.request_timeout))?;
        Ok(parsed.into_text())
    }

    fn transcripts(&self) -> &TranscriptStore {
        &self.transcripts
    }

    fn summary_model(&self) -> Option<String> {
        Some(self.fast_model.clone())
    }
}
