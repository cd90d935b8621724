// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ollama backend adapter for the Parley phone assistant.
//!
//! Talks to Ollama's native `/api/chat` endpoint on the LAN. This is the
//! local tier: cheap and fast when reachable, and an empty reply on any
//! failure so the router can fall back.

pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use parley_config::ParleyConfig;
use parley_core::{
    BackendAdapter, BackendKind, ChatRequest, HealthStatus, ParleyError, TranscriptStore,
};
use tracing::{debug, info};

use crate::types::{ChatOptions, ChatPayload, ChatResponse, OllamaMessage};

const TEMPERATURE: f32 = 0.7;

/// Local backend over an Ollama server.
pub struct OllamaAdapter {
    client: reqwest::Client,
    base_url: String,
    default_model: String,
    fast_model: String,
    request_timeout: Duration,
    probe_timeout: Duration,
    transcripts: TranscriptStore,
}

impl OllamaAdapter {
    pub fn new(config: &ParleyConfig) -> Result<Self, ParleyError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ParleyError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        let base_url = config.ollama.url.trim_end_matches('/').to_string();
        info!(
            url = %base_url,
            model = %config.ollama.default_model,
            "Ollama backend initialized"
        );

        Ok(Self {
            client,
            base_url,
            default_model: config.ollama.default_model.clone(),
            fast_model: config.ollama.fast_model.clone(),
            request_timeout: Duration::from_secs(config.routing.request_timeout_secs),
            probe_timeout: Duration::from_secs(config.routing.probe_timeout_secs),
            transcripts: TranscriptStore::new(config.routing.max_history),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn payload(&self, request: ChatRequest) -> ChatPayload {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if !request.system.is_empty() {
            messages.push(OllamaMessage {
                role: "system".into(),
                content: request.system,
            });
        }
        messages.extend(request.messages.into_iter().map(|turn| OllamaMessage {
            role: turn.role.to_string(),
            content: turn.content,
        }));

        ChatPayload {
            model: request.model.unwrap_or_else(|| self.default_model.clone()),
            messages,
            stream: false,
            options: ChatOptions {
                num_predict: request.max_tokens,
                temperature: TEMPERATURE,
            },
        }
    }

    fn transport_error(&self, err: reqwest::Error, timeout: Duration) -> ParleyError {
        if err.is_timeout() {
            ParleyError::Timeout { duration: timeout }
        } else {
            ParleyError::from_http(err, "Ollama request failed")
        }
    }
}

#[async_trait]
impl BackendAdapter for OllamaAdapter {
    fn name(&self) -> &str {
        "ollama"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    /// `GET /api/tags` answering 200 means the server is up.
    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e, self.probe_timeout))?;

        let status = response.status();
        if status == reqwest::StatusCode::OK {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy(format!("/api/tags returned {status}")))
        }
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, ParleyError> {
        let payload = self.payload(request);
        debug!(model = %payload.model, messages = payload.messages.len(), "sending Ollama chat");

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .timeout(self.request_timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.transport_error(e, self.request_timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ParleyError::Provider {
                message: format!("Ollama returned {status}: {body}"),
                source: None,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| self.transport_error(e, self.request_timeout))?;
        Ok(parsed.into_text())
    }

    fn transcripts(&self) -> &TranscriptStore {
        &self.transcripts
    }

    /// Summaries go to the fast model.
    fn summary_model(&self) -> Option<String> {
        Some(self.fast_model.clone())
    }

    /// Local summaries are sent without a system message.
    fn summary_system_prompt(&self) -> &str {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::traits::backend::{DEFAULT_PHONE_PROMPT, SUMMARY_REQUEST};
    use parley_core::{ConversationId, ConversationTurn, GenerateRequest};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter(server: &MockServer) -> OllamaAdapter {
        let mut config = ParleyConfig::default();
        config.ollama.url = format!("{}/", server.uri());
        config.routing.request_timeout_secs = 2;
        config.routing.probe_timeout_secs = 1;
        OllamaAdapter::new(&config).unwrap()
    }

    fn chat_reply(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "model": "quick-responder:latest",
            "message": {"role": "assistant", "content": text},
            "done": true
        }))
    }

    fn caller() -> ConversationId {
        ConversationId::voice("+15557654321")
    }

    #[tokio::test]
    async fn trailing_slash_is_trimmed() {
        let server = MockServer::start().await;
        let adapter = adapter(&server);
        assert_eq!(adapter.base_url(), server.uri());
    }

    #[tokio::test]
    async fn health_check_reports_tags_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"models": []})))
            .mount(&server)
            .await;

        let adapter = adapter(&server);
        assert_eq!(adapter.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn health_check_non_200_is_unhealthy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let status = adapter(&server).health_check().await.unwrap();
        assert!(!status.is_available());
    }

    #[tokio::test]
    async fn generate_prepends_system_prompt_and_uses_requested_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(serde_json::json!({
                "model": "cyberque-chat:latest",
                "stream": false,
                "options": {"num_predict": 512},
                "messages": [
                    {"role": "system", "content": DEFAULT_PHONE_PROMPT},
                    {"role": "user", "content": "book me for tuesday"}
                ]
            })))
            .respond_with(chat_reply("Tuesday at ten works."))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = adapter(&server);
        let request = GenerateRequest::new("book me for tuesday")
            .with_model(Some("cyberque-chat:latest".into()));
        let text = adapter.generate(&caller(), request).await.unwrap();

        assert_eq!(text, "Tuesday at ten works.");
        let turns = adapter.transcripts().snapshot(&caller()).await;
        assert_eq!(turns.last(), Some(&ConversationTurn::assistant("Tuesday at ten works.")));
    }

    #[tokio::test]
    async fn server_error_returns_empty_and_rolls_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
            .mount(&server)
            .await;

        let adapter = adapter(&server);
        let text = adapter
            .generate(&caller(), GenerateRequest::new("hello"))
            .await
            .unwrap();

        assert_eq!(text, "");
        assert!(adapter.transcripts().is_empty(&caller()).await);
    }

    #[tokio::test]
    async fn slow_server_times_out_and_returns_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(chat_reply("too late").set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let adapter = adapter(&server);
        let err = adapter
            .chat(ChatRequest {
                system: String::new(),
                messages: vec![ConversationTurn::user("hi")],
                model: None,
                max_tokens: 16,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ParleyError::Timeout { .. }), "got: {err:?}");

        let text = adapter
            .generate(&caller(), GenerateRequest::new("hi"))
            .await
            .unwrap();
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn summary_uses_fast_model_without_system_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(serde_json::json!({
                "model": "quick-responder:latest",
                "options": {"num_predict": 256},
                "messages": [
                    {"role": "user", "content": "hello"},
                    {"role": "assistant", "content": "Hi there."},
                    {"role": "user", "content": SUMMARY_REQUEST}
                ]
            })))
            .respond_with(chat_reply("Caller said hello."))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(chat_reply("Hi there."))
            .mount(&server)
            .await;

        let adapter = adapter(&server);
        adapter
            .generate(&caller(), GenerateRequest::new("hello"))
            .await
            .unwrap();
        assert_eq!(adapter.summarize(&caller()).await, "Caller said hello.");
    }
}
