// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backend routing with availability awareness and hybrid fallback.
//!
//! Orchestrates backend selection: classify > probe > pick by precedence >
//! dispatch > fall back at most once > apology.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parley_config::ParleyConfig;
use parley_config::model::RoutingConfig;
use parley_core::{BackendAdapter, BackendKind, ConversationId, GenerateRequest, ParleyError};
use serde::Serialize;
use strum::{Display, EnumString};
use tracing::{error, info, warn};

use crate::availability::{Availability, AvailabilityProber, Backends};
use crate::classifier::{QueryClassifier, QueryComplexity};
use crate::usage::UsageStats;

/// Reply when no backend produced usable text.
pub const APOLOGY_REPLY: &str =
    "I apologize, but I'm having trouble processing that. Could you please try again?";

/// Summary text when no backend holds history for the conversation.
pub const NO_HISTORY_REPLY: &str = parley_core::traits::backend::NO_HISTORY_REPLY;

/// Hybrid primaries shorter than this (after trimming) are re-dispatched.
const MIN_USEFUL_REPLY_CHARS: usize = 5;

/// Where a request goes. The two hybrid values are intents that
/// [`Router::generate_response`] always resolves to a concrete backend.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BackendType {
    FastLocal,
    SmartLocal,
    ChatLocal,
    Cloud,
    EdgeFast,
    EdgeSmart,
    /// Local smart model first, cloud if the reply is unusable.
    HybridLocalCloud,
    /// Edge first, local chat model if the reply is unusable.
    HybridEdgeLocal,
}

impl BackendType {
    /// The adapter slot that serves this backend (the primary, for hybrids).
    pub fn kind(self) -> BackendKind {
        match self {
            BackendType::FastLocal
            | BackendType::SmartLocal
            | BackendType::ChatLocal
            | BackendType::HybridLocalCloud => BackendKind::Local,
            BackendType::EdgeFast | BackendType::EdgeSmart | BackendType::HybridEdgeLocal => {
                BackendKind::Edge
            }
            BackendType::Cloud => BackendKind::Cloud,
        }
    }

    pub fn is_hybrid(self) -> bool {
        matches!(
            self,
            BackendType::HybridLocalCloud | BackendType::HybridEdgeLocal
        )
    }

    /// Concrete backend a hybrid intent stands for when its fallback never ran.
    pub fn primary(self) -> BackendType {
        match self {
            BackendType::HybridLocalCloud => BackendType::SmartLocal,
            BackendType::HybridEdgeLocal => BackendType::EdgeSmart,
            other => other,
        }
    }
}

/// One routing outcome. Replaced wholesale on fallback; `complexity` carries over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutingDecision {
    pub backend: BackendType,
    /// Model override for the adapter; `None` uses the adapter's default.
    pub model: Option<String>,
    pub reason: String,
    pub complexity: QueryComplexity,
}

impl RoutingDecision {
    fn new(
        backend: BackendType,
        model: Option<String>,
        reason: impl Into<String>,
        complexity: QueryComplexity,
    ) -> Self {
        Self {
            backend,
            model,
            reason: reason.into(),
            complexity,
        }
    }

    /// Same decision with a hybrid intent collapsed onto its primary.
    fn resolved(self) -> Self {
        Self {
            backend: self.backend.primary(),
            ..self
        }
    }
}

/// Preference switches from `[routing]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingPolicy {
    pub prefer_local: bool,
    pub prefer_edge: bool,
}

impl Default for RoutingPolicy {
    fn default() -> Self {
        Self {
            prefer_local: true,
            prefer_edge: false,
        }
    }
}

impl From<&RoutingConfig> for RoutingPolicy {
    fn from(config: &RoutingConfig) -> Self {
        Self {
            prefer_local: config.prefer_local,
            prefer_edge: config.prefer_edge,
        }
    }
}

/// Model names per tier for the local and edge backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCatalog {
    pub local_fast: String,
    pub local_chat: String,
    pub local_smart: String,
    pub edge_small: String,
    pub edge_medium: String,
    pub edge_large: String,
}

impl ModelCatalog {
    pub fn from_config(config: &ParleyConfig) -> Self {
        Self {
            local_fast: config.ollama.fast_model.clone(),
            local_chat: config.ollama.chat_model.clone(),
            local_smart: config.ollama.smart_model.clone(),
            edge_small: config.edge.fast_model.clone(),
            edge_medium: config.edge.general_model.clone(),
            edge_large: config.edge.smart_model.clone(),
        }
    }

    fn local_for(&self, complexity: QueryComplexity) -> &str {
        match complexity {
            QueryComplexity::Simple => &self.local_fast,
            QueryComplexity::Moderate => &self.local_chat,
            QueryComplexity::Complex => &self.local_smart,
        }
    }

    fn edge_for(&self, complexity: QueryComplexity) -> &str {
        match complexity {
            QueryComplexity::Simple => &self.edge_small,
            QueryComplexity::Moderate => &self.edge_medium,
            QueryComplexity::Complex => &self.edge_large,
        }
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::from_config(&ParleyConfig::default())
    }
}

/// Picks a backend for each utterance, dispatches it, and absorbs failures.
pub struct Router {
    backends: Backends,
    classifier: QueryClassifier,
    prober: AvailabilityProber,
    policy: RoutingPolicy,
    catalog: ModelCatalog,
    usage: Arc<UsageStats>,
}

impl Router {
    pub fn new(
        backends: Backends,
        prober: AvailabilityProber,
        policy: RoutingPolicy,
        catalog: ModelCatalog,
        usage: Arc<UsageStats>,
    ) -> Self {
        Self {
            backends,
            classifier: QueryClassifier::new(),
            prober,
            policy,
            catalog,
            usage,
        }
    }

    /// Router wired from the `[routing]`, `[ollama]` and `[edge]` sections.
    pub fn from_config(backends: Backends, config: &ParleyConfig, usage: Arc<UsageStats>) -> Self {
        Self::new(
            backends,
            AvailabilityProber::new(Duration::from_secs(config.routing.probe_timeout_secs)),
            RoutingPolicy::from(&config.routing),
            ModelCatalog::from_config(config),
            usage,
        )
    }

    pub fn backends(&self) -> &Backends {
        &self.backends
    }

    pub fn usage(&self) -> &Arc<UsageStats> {
        &self.usage
    }

    /// Fresh availability snapshot, probing every configured adapter.
    pub async fn availability(&self) -> Availability {
        self.prober.snapshot(&self.backends).await
    }

    /// Choose a backend for `utterance`. Never dispatches.
    pub async fn route(&self, conversation: &ConversationId, utterance: &str) -> RoutingDecision {
        let complexity = self.classifier.classify(utterance);
        let is_appointment = self.classifier.is_appointment_related(utterance);
        let availability = self.availability().await;
        let decision = self.decide(complexity, is_appointment, availability);

        if decision.backend == BackendType::Cloud && availability.none() {
            error!(conversation = %conversation, "no AI backends available");
        }
        decision
    }

    /// Routing precedence over an availability snapshot. Pure.
    pub fn decide(
        &self,
        complexity: QueryComplexity,
        is_appointment: bool,
        up: Availability,
    ) -> RoutingDecision {
        use BackendType::*;
        use QueryComplexity::{Complex, Moderate, Simple};

        let local_model = || Some(self.catalog.local_for(complexity).to_string());
        let edge_model = || Some(self.catalog.edge_for(complexity).to_string());

        if self.policy.prefer_edge && up.edge && complexity == Simple {
            return RoutingDecision::new(
                EdgeFast,
                edge_model(),
                "Simple query, using edge gateway for low latency",
                complexity,
            );
        }

        match (up.local, up.edge, up.cloud) {
            (false, true, false) => {
                let backend = if complexity == Simple { EdgeFast } else { EdgeSmart };
                return RoutingDecision::new(
                    backend,
                    edge_model(),
                    "Only edge gateway available",
                    complexity,
                );
            }
            (true, false, false) => {
                let backend = if complexity == Simple { FastLocal } else { ChatLocal };
                return RoutingDecision::new(
                    backend,
                    local_model(),
                    "Only local model available",
                    complexity,
                );
            }
            (false, false, true) => {
                return RoutingDecision::new(Cloud, None, "Only cloud model available", complexity);
            }
            (false, false, false) => {
                return RoutingDecision::new(
                    Cloud,
                    None,
                    "No backends confirmed available, trying cloud",
                    complexity,
                );
            }
            _ => {}
        }

        match complexity {
            Simple => RoutingDecision::new(
                FastLocal,
                Some(self.catalog.local_fast.clone()),
                "Simple query, using fast local model",
                complexity,
            ),
            Moderate if is_appointment => RoutingDecision::new(
                ChatLocal,
                Some(self.catalog.local_chat.clone()),
                "Appointment query, using local chat model",
                complexity,
            ),
            Moderate if self.policy.prefer_local => RoutingDecision::new(
                ChatLocal,
                Some(self.catalog.local_chat.clone()),
                "Moderate query, preferring local model",
                complexity,
            ),
            Moderate => RoutingDecision::new(
                Cloud,
                None,
                "Moderate query, using cloud for quality",
                complexity,
            ),
            Complex if self.policy.prefer_local => RoutingDecision::new(
                HybridLocalCloud,
                Some(self.catalog.local_smart.clone()),
                "Complex query, trying local smart model with cloud fallback",
                complexity,
            ),
            Complex => RoutingDecision::new(
                Cloud,
                None,
                "Complex query, using cloud for best quality",
                complexity,
            ),
        }
    }

    /// Route, dispatch, and fall back. Always yields text and the decision
    /// that actually produced it; errors are logged, never returned.
    pub async fn generate_response(
        &self,
        conversation: &ConversationId,
        utterance: &str,
        system_prompt: Option<&str>,
    ) -> (String, RoutingDecision) {
        let started = Instant::now();
        let decision = self.route(conversation, utterance).await;
        info!(
            conversation = %conversation,
            backend = %decision.backend,
            complexity = %decision.complexity,
            reason = %decision.reason,
            "routing decision"
        );

        let (text, decision) = match self
            .execute(conversation, utterance, system_prompt, decision.clone())
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(backend = %decision.backend, error = %e, "backend error");
                self.recover(conversation, utterance, system_prompt, decision, e)
                    .await
            }
        };

        metrics::histogram!("parley_response_latency_seconds")
            .record(started.elapsed().as_secs_f64());

        if text.trim().is_empty() {
            warn!(backend = %decision.backend, "no usable reply, apologizing");
            return (APOLOGY_REPLY.to_string(), decision);
        }

        self.usage.record(decision.backend);
        (text, decision)
    }

    /// Runs a decision, including the hybrid short-reply fallback.
    async fn execute(
        &self,
        conversation: &ConversationId,
        utterance: &str,
        system_prompt: Option<&str>,
        decision: RoutingDecision,
    ) -> Result<(String, RoutingDecision), ParleyError> {
        let text = self
            .dispatch(
                decision.backend.kind(),
                conversation,
                utterance,
                system_prompt,
                decision.model.clone(),
            )
            .await?;

        let (fallback, fallback_model, reason) = match decision.backend {
            BackendType::HybridLocalCloud => {
                (BackendType::Cloud, None, "Hybrid fallback to cloud model")
            }
            BackendType::HybridEdgeLocal => (
                BackendType::ChatLocal,
                Some(self.catalog.local_chat.clone()),
                "Hybrid fallback to local model",
            ),
            _ => return Ok((text, decision)),
        };

        if text.trim().chars().count() >= MIN_USEFUL_REPLY_CHARS {
            return Ok((text, decision.resolved()));
        }
        if self.adapter(fallback.kind()).is_none() {
            warn!(
                backend = %decision.backend,
                fallback = %fallback,
                "hybrid reply insufficient and fallback not configured"
            );
            return Ok((text, decision.resolved()));
        }

        info!(
            from = %decision.backend,
            to = %fallback,
            "hybrid primary reply insufficient, falling back"
        );
        metrics::counter!("parley_backend_fallbacks_total", "reason" => "hybrid").increment(1);
        let text = self
            .dispatch(
                fallback.kind(),
                conversation,
                utterance,
                system_prompt,
                fallback_model.clone(),
            )
            .await?;
        Ok((
            text,
            RoutingDecision::new(fallback, fallback_model, reason, decision.complexity),
        ))
    }

    /// Error path: one retry on cloud, otherwise an empty reply on the
    /// original (resolved) decision.
    async fn recover(
        &self,
        conversation: &ConversationId,
        utterance: &str,
        system_prompt: Option<&str>,
        decision: RoutingDecision,
        cause: ParleyError,
    ) -> (String, RoutingDecision) {
        if decision.backend == BackendType::Cloud || self.backends.cloud.is_none() {
            return (String::new(), decision.resolved());
        }

        info!(from = %decision.backend, cause = %cause, "falling back to cloud after error");
        metrics::counter!("parley_backend_fallbacks_total", "reason" => "error").increment(1);
        match self
            .dispatch(BackendKind::Cloud, conversation, utterance, system_prompt, None)
            .await
        {
            Ok(text) => {
                let reason = format!("Fallback to cloud after {} error", decision.backend);
                (
                    text,
                    RoutingDecision::new(BackendType::Cloud, None, reason, decision.complexity),
                )
            }
            Err(e) => {
                error!(error = %e, "cloud fallback also failed");
                (String::new(), decision.resolved())
            }
        }
    }

    async fn dispatch(
        &self,
        kind: BackendKind,
        conversation: &ConversationId,
        utterance: &str,
        system_prompt: Option<&str>,
        model: Option<String>,
    ) -> Result<String, ParleyError> {
        let adapter = self
            .adapter(kind)
            .ok_or_else(|| ParleyError::Config(format!("{kind} backend is not configured")))?;
        let request = GenerateRequest::new(utterance)
            .with_system_prompt(system_prompt.map(str::to_string))
            .with_model(model);
        adapter.generate(conversation, request).await
    }

    fn adapter(&self, kind: BackendKind) -> Option<&Arc<dyn BackendAdapter>> {
        match kind {
            BackendKind::Local => self.backends.local.as_ref(),
            BackendKind::Edge => self.backends.edge.as_ref(),
            BackendKind::Cloud => self.backends.cloud.as_ref(),
        }
    }

    /// Clear `conversation` on every configured adapter.
    pub fn reset_conversations(&self, conversation: &ConversationId) {
        for adapter in self.backends.configured() {
            adapter.reset(conversation);
        }
    }

    /// Drops transcripts idle for `max_idle` on every configured adapter.
    pub fn expire_idle_conversations(&self, max_idle: Duration) -> usize {
        self.backends
            .configured()
            .map(|adapter| adapter.transcripts().expire_idle(max_idle))
            .sum()
    }

    /// Summary from the first adapter (local, edge, cloud) holding history
    /// for `conversation`.
    pub async fn get_conversation_summary(&self, conversation: &ConversationId) -> String {
        for adapter in self.backends.configured() {
            if !adapter.transcripts().is_empty(conversation).await {
                return adapter.summarize(conversation).await;
            }
        }
        NO_HISTORY_REPLY.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router(policy: RoutingPolicy) -> Router {
        Router::new(
            Backends::default(),
            AvailabilityProber::default(),
            policy,
            ModelCatalog::default(),
            Arc::new(UsageStats::new()),
        )
    }

    const ALL: Availability = Availability {
        local: true,
        edge: true,
        cloud: true,
    };

    #[test]
    fn prefer_edge_takes_simple_queries() {
        let r = router(RoutingPolicy {
            prefer_local: true,
            prefer_edge: true,
        });
        let d = r.decide(QueryComplexity::Simple, false, ALL);
        assert_eq!(d.backend, BackendType::EdgeFast);
        assert_eq!(d.model.as_deref(), Some("llama-3.2-1b"));

        // Only simple queries are diverted.
        let d = r.decide(QueryComplexity::Moderate, false, ALL);
        assert_eq!(d.backend, BackendType::ChatLocal);
    }

    #[test]
    fn only_edge_available_uses_tiered_edge_models() {
        let r = router(RoutingPolicy::default());
        let up = Availability {
            edge: true,
            ..Availability::default()
        };
        let d = r.decide(QueryComplexity::Moderate, false, up);
        assert_eq!(d.backend, BackendType::EdgeSmart);
        assert_eq!(d.model.as_deref(), Some("llama-3.1-8b"));
        assert_eq!(d.reason, "Only edge gateway available");

        let d = r.decide(QueryComplexity::Complex, false, up);
        assert_eq!(d.model.as_deref(), Some("llama-3.3-70b"));
        let d = r.decide(QueryComplexity::Simple, false, up);
        assert_eq!(d.backend, BackendType::EdgeFast);
    }

    #[test]
    fn only_local_available() {
        let r = router(RoutingPolicy::default());
        let up = Availability {
            local: true,
            ..Availability::default()
        };
        let d = r.decide(QueryComplexity::Simple, false, up);
        assert_eq!(d.backend, BackendType::FastLocal);
        assert_eq!(d.model.as_deref(), Some("quick-responder:latest"));

        let d = r.decide(QueryComplexity::Complex, false, up);
        assert_eq!(d.backend, BackendType::ChatLocal);
        assert_eq!(d.model.as_deref(), Some("llama3.3:70b"));
    }

    #[test]
    fn only_cloud_or_nothing_routes_to_cloud() {
        let r = router(RoutingPolicy::default());
        let cloud_only = Availability {
            cloud: true,
            ..Availability::default()
        };
        let d = r.decide(QueryComplexity::Simple, false, cloud_only);
        assert_eq!(d.backend, BackendType::Cloud);
        assert!(d.model.is_none());

        let d = r.decide(QueryComplexity::Complex, false, Availability::default());
        assert_eq!(d.backend, BackendType::Cloud);
        assert!(d.reason.contains("No backends confirmed available"));
    }

    #[test]
    fn multi_backend_precedence() {
        let r = router(RoutingPolicy::default());
        let d = r.decide(QueryComplexity::Simple, false, ALL);
        assert_eq!(d.backend, BackendType::FastLocal);

        let d = r.decide(QueryComplexity::Moderate, true, ALL);
        assert_eq!(d.backend, BackendType::ChatLocal);
        assert!(d.reason.starts_with("Appointment query"));

        let d = r.decide(QueryComplexity::Complex, false, ALL);
        assert_eq!(d.backend, BackendType::HybridLocalCloud);
        assert_eq!(d.model.as_deref(), Some("llama3.3:70b"));
    }

    #[test]
    fn cloud_preferred_when_local_not_preferred() {
        let r = router(RoutingPolicy {
            prefer_local: false,
            prefer_edge: false,
        });
        assert_eq!(
            r.decide(QueryComplexity::Moderate, false, ALL).backend,
            BackendType::Cloud
        );
        assert_eq!(
            r.decide(QueryComplexity::Complex, false, ALL).backend,
            BackendType::Cloud
        );
        // Appointments stay local regardless.
        assert_eq!(
            r.decide(QueryComplexity::Moderate, true, ALL).backend,
            BackendType::ChatLocal
        );
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn logs_when_no_backend_is_available() {
        let r = router(RoutingPolicy::default());
        let d = r
            .route(&ConversationId::voice("+14155550100"), "hello")
            .await;
        assert_eq!(d.backend, BackendType::Cloud);
        assert!(logs_contain("no AI backends available"));
    }

    #[tokio::test]
    async fn availability_reflects_configured_adapters() {
        use parley_test_utils::MockBackend;

        let backends = Backends {
            local: Some(Arc::new(MockBackend::new(BackendKind::Local).unavailable())),
            edge: None,
            cloud: Some(Arc::new(MockBackend::new(BackendKind::Cloud))),
        };
        let r = Router::from_config(
            backends,
            &ParleyConfig::default(),
            Arc::new(UsageStats::new()),
        );
        let up = r.availability().await;
        assert!(!up.local && !up.edge && up.cloud);
    }

    #[test]
    fn hybrid_intents_resolve_to_primary() {
        assert_eq!(BackendType::HybridLocalCloud.primary(), BackendType::SmartLocal);
        assert_eq!(BackendType::HybridEdgeLocal.primary(), BackendType::EdgeSmart);
        assert_eq!(BackendType::Cloud.primary(), BackendType::Cloud);
        assert_eq!(BackendType::HybridEdgeLocal.kind(), BackendKind::Edge);
        assert_eq!(BackendType::HybridLocalCloud.to_string(), "hybrid_local_cloud");
    }

    fn edge_local_router(
        edge: parley_test_utils::MockBackend,
    ) -> (
        Router,
        Arc<parley_test_utils::MockBackend>,
        Arc<parley_test_utils::MockBackend>,
    ) {
        use parley_test_utils::MockBackend;

        let edge = Arc::new(edge);
        let local = Arc::new(MockBackend::new(BackendKind::Local).with_replies(["local answer"]));
        let backends = Backends {
            local: Some(local.clone()),
            edge: Some(edge.clone()),
            cloud: None,
        };
        let r = Router::from_config(
            backends,
            &ParleyConfig::default(),
            Arc::new(UsageStats::new()),
        );
        (r, edge, local)
    }

    fn edge_local_decision(r: &Router) -> RoutingDecision {
        RoutingDecision::new(
            BackendType::HybridEdgeLocal,
            Some(r.catalog.edge_large.clone()),
            "Hybrid edge/local for complex query",
            QueryComplexity::Complex,
        )
    }

    #[tokio::test]
    async fn short_edge_reply_falls_back_to_local_chat() {
        use parley_test_utils::MockBackend;

        let (r, edge, local) =
            edge_local_router(MockBackend::new(BackendKind::Edge).with_replies(["ok"]));
        let conv = ConversationId::voice("+15550001111");
        let decision = edge_local_decision(&r);

        let (text, d) = r
            .execute(&conv, "explain the warranty terms", None, decision)
            .await
            .unwrap();

        assert_eq!(text, "local answer");
        assert_eq!(
            d,
            RoutingDecision::new(
                BackendType::ChatLocal,
                Some(r.catalog.local_chat.clone()),
                "Hybrid fallback to local model",
                QueryComplexity::Complex,
            )
        );
        assert_eq!(edge.chat_calls().await, 1);
        let sent = local.last_request().await.unwrap();
        assert_eq!(sent.model.as_deref(), Some(r.catalog.local_chat.as_str()));
    }

    #[tokio::test]
    async fn useful_edge_reply_resolves_to_edge_smart() {
        use parley_test_utils::MockBackend;

        let (r, edge, local) = edge_local_router(
            MockBackend::new(BackendKind::Edge).with_replies(["The warranty covers two years."]),
        );
        let conv = ConversationId::voice("+15550001111");
        let decision = edge_local_decision(&r);

        let (text, d) = r
            .execute(&conv, "explain the warranty terms", None, decision.clone())
            .await
            .unwrap();

        assert_eq!(text, "The warranty covers two years.");
        assert_eq!(d.backend, BackendType::EdgeSmart);
        assert_eq!(d.model, decision.model);
        assert_eq!(d.reason, decision.reason);
        assert_eq!(edge.chat_calls().await, 1);
        assert_eq!(local.chat_calls().await, 0);
    }
}
