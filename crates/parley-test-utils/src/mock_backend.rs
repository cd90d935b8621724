// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock AI backend for deterministic routing tests.
//!
//! `MockBackend` implements `BackendAdapter` with scripted chat results,
//! switchable health, and a log of every request it was sent. It runs the
//! real shared turn logic, so transcripts behave exactly as in production.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use parley_core::traits::backend::run_turn;
use parley_core::{
    BackendAdapter, BackendKind, ChatRequest, ConversationId, GenerateRequest, HealthStatus,
    ParleyError, TranscriptStore,
};

/// One scripted chat outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    Text(String),
    /// A provider error (connection refused, 5xx, malformed body).
    Error(String),
    /// A generation timeout.
    Timeout,
}

/// What `health_check` reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockHealth {
    Healthy,
    Unhealthy,
    /// `health_check` itself returns an error.
    Error,
}

/// A scripted backend adapter.
///
/// Replies are popped from a FIFO queue. When the queue is empty, a default
/// `"<kind> reply"` text is returned.
pub struct MockBackend {
    kind: BackendKind,
    name: String,
    transcripts: TranscriptStore,
    health: Mutex<MockHealth>,
    health_delay: Option<Duration>,
    chat_delay: Option<Duration>,
    replies: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<ChatRequest>>,
    failure_reply: String,
    generate_error: Mutex<bool>,
}

impl MockBackend {
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            name: format!("mock-{kind}"),
            transcripts: TranscriptStore::new(20),
            health: Mutex::new(MockHealth::Healthy),
            health_delay: None,
            chat_delay: None,
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            failure_reply: String::new(),
            generate_error: Mutex::new(false),
        }
    }

    /// Queue replies returned in order.
    pub fn with_replies<I, S>(mut self, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.replies
            .get_mut()
            .extend(replies.into_iter().map(|r| MockReply::Text(r.into())));
        self
    }

    /// Queue one scripted outcome.
    pub fn then(mut self, reply: MockReply) -> Self {
        self.replies.get_mut().push_back(reply);
        self
    }

    /// Report `Unhealthy` from `health_check`.
    pub fn unavailable(mut self) -> Self {
        *self.health.get_mut() = MockHealth::Unhealthy;
        self
    }

    /// Make `health_check` return an error.
    pub fn health_error(mut self) -> Self {
        *self.health.get_mut() = MockHealth::Error;
        self
    }

    pub fn health_delay(mut self, delay: Duration) -> Self {
        self.health_delay = Some(delay);
        self
    }

    pub fn chat_delay(mut self, delay: Duration) -> Self {
        self.chat_delay = Some(delay);
        self
    }

    pub fn with_failure_reply(mut self, reply: impl Into<String>) -> Self {
        self.failure_reply = reply.into();
        self
    }

    pub fn with_max_history(mut self, max_turns: usize) -> Self {
        self.transcripts = TranscriptStore::new(max_turns);
        self
    }

    /// Make `generate` return `Err` without touching the transcript, as an
    /// adapter with an internal fault would.
    pub fn failing_generate(mut self) -> Self {
        *self.generate_error.get_mut() = true;
        self
    }

    pub async fn push_reply(&self, reply: MockReply) {
        self.replies.lock().await.push_back(reply);
    }

    pub async fn set_health(&self, health: MockHealth) {
        *self.health.lock().await = health;
    }

    /// Every chat request sent to the provider, oldest first.
    pub async fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn chat_calls(&self) -> usize {
        self.requests.lock().await.len()
    }

    pub async fn last_request(&self) -> Option<ChatRequest> {
        self.requests.lock().await.last().cloned()
    }
}

#[async_trait]
impl BackendAdapter for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        if let Some(delay) = self.health_delay {
            tokio::time::sleep(delay).await;
        }
        match *self.health.lock().await {
            MockHealth::Healthy => Ok(HealthStatus::Healthy),
            MockHealth::Unhealthy => Ok(HealthStatus::Unhealthy("scripted outage".into())),
            MockHealth::Error => Err(ParleyError::Provider {
                message: "health endpoint unreachable".into(),
                source: None,
            }),
        }
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, ParleyError> {
        self.requests.lock().await.push(request);
        if let Some(delay) = self.chat_delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.replies.lock().await.pop_front();
        match next {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Error(message)) => Err(ParleyError::Provider {
                message,
                source: None,
            }),
            Some(MockReply::Timeout) => Err(ParleyError::Timeout {
                duration: Duration::from_secs(30),
            }),
            None => Ok(format!("{} reply", self.kind)),
        }
    }

    fn transcripts(&self) -> &TranscriptStore {
        &self.transcripts
    }

    fn failure_reply(&self) -> &str {
        &self.failure_reply
    }

    async fn generate(
        &self,
        conversation: &ConversationId,
        request: GenerateRequest,
    ) -> Result<String, ParleyError> {
        if *self.generate_error.lock().await {
            return Err(ParleyError::Internal(format!(
                "{} scripted generate failure",
                self.name
            )));
        }
        run_turn(self, conversation, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conv() -> ConversationId {
        ConversationId::voice("+15550001111")
    }

    #[tokio::test]
    async fn default_reply_when_queue_empty() {
        let backend = MockBackend::new(BackendKind::Local);
        let reply = backend
            .generate(&conv(), GenerateRequest::new("hello"))
            .await
            .unwrap();
        assert_eq!(reply, "local reply");
    }

    #[tokio::test]
    async fn scripted_outcomes_in_order() {
        let backend = MockBackend::new(BackendKind::Edge)
            .with_replies(["first"])
            .then(MockReply::Timeout)
            .with_failure_reply("edge down");

        let first = backend
            .generate(&conv(), GenerateRequest::new("one"))
            .await
            .unwrap();
        let second = backend
            .generate(&conv(), GenerateRequest::new("two"))
            .await
            .unwrap();

        assert_eq!(first, "first");
        assert_eq!(second, "edge down");
        assert_eq!(backend.chat_calls().await, 2);
        // The timed-out turn was rolled back.
        assert_eq!(backend.transcripts().len(&conv()).await, 2);
    }

    #[tokio::test]
    async fn failing_generate_leaves_no_trace() {
        let backend = MockBackend::new(BackendKind::Local).failing_generate();
        assert!(
            backend
                .generate(&conv(), GenerateRequest::new("hello"))
                .await
                .is_err()
        );
        assert_eq!(backend.chat_calls().await, 0);
        assert!(backend.transcripts().is_empty(&conv()).await);
    }

    #[tokio::test]
    async fn health_can_be_switched() {
        let backend = MockBackend::new(BackendKind::Local);
        assert!(backend.health_check().await.unwrap().is_available());
        backend.set_health(MockHealth::Unhealthy).await;
        assert!(!backend.health_check().await.unwrap().is_available());
        backend.set_health(MockHealth::Error).await;
        assert!(backend.health_check().await.is_err());
    }
}
