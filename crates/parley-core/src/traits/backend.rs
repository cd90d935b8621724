// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backend adapter trait for AI provider integrations (local, edge, cloud).
//!
//! Implementors supply the provider-specific pieces ([`BackendAdapter::chat`],
//! [`BackendAdapter::health_check`], their transcript arena and defaults).
//! The conversational behavior shared by every provider lives in the provided
//! methods: blank-input handling, transcript append and trim, rollback of
//! failed turns, and summaries.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::ParleyError;
use crate::redact::preview;
use crate::transcript::TranscriptStore;
use crate::types::{
    BackendKind, ChatRequest, ConversationId, ConversationTurn, GenerateRequest, HealthStatus,
};

/// Reply to blank or whitespace-only input.
pub const BLANK_INPUT_REPLY: &str = "I didn't catch that. Could you please repeat?";

/// Summary text for a conversation with no turns.
pub const NO_HISTORY_REPLY: &str = "No conversation history.";

/// Summary text when the backend could not produce one.
pub const SUMMARY_UNAVAILABLE_REPLY: &str = "Unable to generate summary.";

/// Default system prompt for short spoken answers.
pub const DEFAULT_PHONE_PROMPT: &str = "You are a helpful phone assistant handling customer inquiries. \
You can help with appointment scheduling, status updates, and general questions. \
Be professional, friendly, and concise in your responses as this is a phone conversation. \
Keep responses brief - under 2 sentences when possible.";

/// System prompt used for summaries unless an adapter overrides it.
pub const SUMMARY_SYSTEM_PROMPT: &str = "Summarize conversations briefly.";

/// Final user turn appended to a transcript to ask for its summary.
pub const SUMMARY_REQUEST: &str =
    "Please provide a brief 1-2 sentence summary of this conversation.";

/// Uniform contract over one AI provider's chat API.
#[async_trait]
pub trait BackendAdapter: Send + Sync + 'static {
    /// Human-readable adapter name used in logs.
    fn name(&self) -> &str;

    /// Which slot of the router this adapter fills.
    fn kind(&self) -> BackendKind;

    /// Cheap liveness check. The prober bounds it with its own timeout.
    async fn health_check(&self) -> Result<HealthStatus, ParleyError>;

    /// Sends one fully assembled chat request and returns the reply text.
    async fn chat(&self, request: ChatRequest) -> Result<String, ParleyError>;

    /// Per-conversation transcripts owned by this adapter.
    fn transcripts(&self) -> &TranscriptStore;

    fn default_system_prompt(&self) -> &str {
        DEFAULT_PHONE_PROMPT
    }

    fn default_max_tokens(&self) -> u32 {
        512
    }

    /// Model used for summaries (`None` = the adapter's default model).
    fn summary_model(&self) -> Option<String> {
        None
    }

    fn summary_max_tokens(&self) -> u32 {
        256
    }

    fn summary_system_prompt(&self) -> &str {
        SUMMARY_SYSTEM_PROMPT
    }

    fn summary_request(&self) -> &str {
        SUMMARY_REQUEST
    }

    /// What `generate` returns after a failed provider call. Empty tells the
    /// router to fall back; a backend with nothing below it returns an apology.
    fn failure_reply(&self) -> &str {
        ""
    }

    /// Generates a reply to `request.message` in the context of `conversation`.
    ///
    /// Provider failures are absorbed: the user turn is rolled back and
    /// [`BackendAdapter::failure_reply`] is returned. See [`run_turn`].
    async fn generate(
        &self,
        conversation: &ConversationId,
        request: GenerateRequest,
    ) -> Result<String, ParleyError> {
        run_turn(self, conversation, request).await
    }

    /// Clears the transcript for `conversation`.
    fn reset(&self, conversation: &ConversationId) {
        self.transcripts().reset(conversation);
    }

    /// Asks the provider to condense its own transcript for `conversation`.
    ///
    /// Returns [`NO_HISTORY_REPLY`] without a request when the transcript is empty.
    async fn summarize(&self, conversation: &ConversationId) -> String {
        let mut messages = self.transcripts().snapshot(conversation).await;
        if messages.is_empty() {
            return NO_HISTORY_REPLY.to_string();
        }
        messages.push(ConversationTurn::user(self.summary_request()));

        let request = ChatRequest {
            system: self.summary_system_prompt().to_string(),
            messages,
            model: self.summary_model(),
            max_tokens: self.summary_max_tokens(),
        };

        match self.chat(request).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => SUMMARY_UNAVAILABLE_REPLY.to_string(),
            Err(e) => {
                warn!(backend = self.name(), error = %e, "summary failed");
                SUMMARY_UNAVAILABLE_REPLY.to_string()
            }
        }
    }
}

/// One conversational turn against `adapter`: the body of
/// [`BackendAdapter::generate`], callable from adapters that wrap it.
///
/// Blank input short-circuits without touching history. Otherwise the user
/// turn is appended (evicting old pairs), the retained transcript is sent,
/// and the reply is appended; an error or empty reply rolls the user turn back.
pub async fn run_turn<A: BackendAdapter + ?Sized>(
    adapter: &A,
    conversation: &ConversationId,
    request: GenerateRequest,
) -> Result<String, ParleyError> {
    let message = request.message.trim();
    if message.is_empty() {
        return Ok(BLANK_INPUT_REPLY.to_string());
    }

    let mut transcript = adapter.transcripts().checkout(conversation).await;
    transcript.push_user(message);

    let chat = ChatRequest {
        system: request
            .system_prompt
            .unwrap_or_else(|| adapter.default_system_prompt().to_string()),
        messages: transcript.turns().to_vec(),
        model: request.model,
        max_tokens: request
            .max_tokens
            .unwrap_or_else(|| adapter.default_max_tokens()),
    };
    let model = chat.model.clone();

    match adapter.chat(chat).await {
        Ok(text) if !text.trim().is_empty() => {
            transcript.push_assistant(text.clone());
            info!(
                backend = adapter.name(),
                model = model.as_deref().unwrap_or("default"),
                message = %preview(message, 50),
                "generated response"
            );
            Ok(text)
        }
        Ok(_) => {
            transcript.rollback_user();
            warn!(
                backend = adapter.name(),
                "provider returned an empty reply, turn rolled back"
            );
            Ok(adapter.failure_reply().to_string())
        }
        Err(e) => {
            transcript.rollback_user();
            warn!(backend = adapter.name(), error = %e, "generation failed, turn rolled back");
            Ok(adapter.failure_reply().to_string())
        }
    }
}
