// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anthropic Claude backend adapter for the Parley phone assistant.
//!
//! This crate implements [`BackendAdapter`] for the Anthropic Messages API.
//! It fills the cloud slot of the router: the last resort when local and
//! edge backends fail, so its failures turn into a spoken apology rather
//! than an empty reply.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use parley_config::ParleyConfig;
use parley_core::types::Role;
use parley_core::{
    BackendAdapter, BackendKind, ChatRequest, HealthStatus, ParleyError, TranscriptStore,
};
use tracing::info;

use crate::client::AnthropicClient;
use crate::types::{ApiMessage, MessageRequest};

/// Phone-brevity system prompt used when the caller supplies none.
pub const CLOUD_PHONE_PROMPT: &str = "You are a helpful phone assistant handling customer inquiries. \
You can help with appointment scheduling, status updates, and general questions. \
Be professional, friendly, and concise in your responses as this is a phone conversation. \
Keep responses brief and to the point.";

/// Reply after a failed cloud call.
pub const CLOUD_APOLOGY_REPLY: &str =
    "I apologize, but I'm having trouble processing that. Could you please repeat?";

const SUMMARY_SYSTEM_PROMPT: &str = "You are a helpful assistant that summarizes conversations.";
const SUMMARY_REQUEST: &str = "Please provide a brief summary of this conversation, \
including any key points, decisions, or action items.";

/// Cloud backend over the Anthropic Messages API.
///
/// API key resolution order: `anthropic.api_key` -> `ANTHROPIC_API_KEY` -> error.
pub struct AnthropicAdapter {
    client: AnthropicClient,
    transcripts: TranscriptStore,
    max_tokens: u32,
}

impl AnthropicAdapter {
    /// Creates the adapter from configuration.
    ///
    /// Fails with [`ParleyError::Config`] when no API key is available.
    pub fn new(config: &ParleyConfig) -> Result<Self, ParleyError> {
        let api_key = config.resolve_anthropic_key().ok_or_else(|| {
            ParleyError::Config(
                "Anthropic API key not found. Set anthropic.api_key in config or ANTHROPIC_API_KEY environment variable.".into(),
            )
        })?;

        let client = AnthropicClient::new(
            &api_key,
            &config.anthropic.api_version,
            config.anthropic.default_model.clone(),
            Duration::from_secs(config.routing.request_timeout_secs),
        )?;

        info!(
            model = config.anthropic.default_model,
            "Anthropic backend initialized"
        );

        Ok(Self {
            client,
            transcripts: TranscriptStore::new(config.routing.max_history),
            max_tokens: config.anthropic.max_tokens,
        })
    }

    /// Creates an adapter with an existing client (for testing).
    #[cfg(test)]
    fn with_client(client: AnthropicClient, max_history: usize) -> Self {
        Self {
            client,
            transcripts: TranscriptStore::new(max_history),
            max_tokens: 1024,
        }
    }

    fn to_message_request(&self, request: ChatRequest) -> MessageRequest {
        let messages = request
            .messages
            .into_iter()
            .filter(|turn| turn.role != Role::System)
            .map(|turn| ApiMessage {
                role: turn.role.to_string(),
                content: turn.content,
            })
            .collect();

        MessageRequest {
            model: request
                .model
                .unwrap_or_else(|| self.client.default_model().to_string()),
            messages,
            system: Some(request.system).filter(|s| !s.is_empty()),
            max_tokens: request.max_tokens,
        }
    }
}

#[async_trait]
impl BackendAdapter for AnthropicAdapter {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Cloud
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        // The key was resolved at construction; probing the API would cost tokens.
        Ok(HealthStatus::Healthy)
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, ParleyError> {
        let api_request = self.to_message_request(request);
        let response = self.client.complete_message(&api_request).await?;
        Ok(response.text())
    }

    fn transcripts(&self) -> &TranscriptStore {
        &self.transcripts
    }

    fn default_system_prompt(&self) -> &str {
        CLOUD_PHONE_PROMPT
    }

    fn default_max_tokens(&self) -> u32 {
        self.max_tokens
    }

    fn summary_max_tokens(&self) -> u32 {
        512
    }

    fn summary_system_prompt(&self) -> &str {
        SUMMARY_SYSTEM_PROMPT
    }

    fn summary_request(&self) -> &str {
        SUMMARY_REQUEST
    }

    fn failure_reply(&self) -> &str {
        CLOUD_APOLOGY_REPLY
    }
}
