// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end routing behavior against scripted backends.

use std::sync::Arc;

use parley_core::{BackendAdapter, BackendKind, ConversationId, ConversationTurn};
use parley_router::{
    APOLOGY_REPLY, AvailabilityProber, BackendType, Backends, ModelCatalog, QueryComplexity,
    Router, RoutingPolicy, UsageStats,
};
use parley_test_utils::{MockBackend, MockReply};

fn caller() -> ConversationId {
    ConversationId::voice("+14155550100")
}

struct Fixture {
    router: Router,
    local: Option<Arc<MockBackend>>,
    edge: Option<Arc<MockBackend>>,
    cloud: Option<Arc<MockBackend>>,
    usage: Arc<UsageStats>,
}

fn fixture(
    local: Option<MockBackend>,
    edge: Option<MockBackend>,
    cloud: Option<MockBackend>,
    policy: RoutingPolicy,
) -> Fixture {
    let local = local.map(Arc::new);
    let edge = edge.map(Arc::new);
    let cloud = cloud.map(Arc::new);
    let as_dyn = |b: &Option<Arc<MockBackend>>| {
        b.as_ref()
            .map(|b| Arc::clone(b) as Arc<dyn BackendAdapter>)
    };
    let backends = Backends {
        local: as_dyn(&local),
        edge: as_dyn(&edge),
        cloud: as_dyn(&cloud),
    };
    let usage = Arc::new(UsageStats::new());
    let router = Router::new(
        backends,
        AvailabilityProber::default(),
        policy,
        ModelCatalog::default(),
        Arc::clone(&usage),
    );
    Fixture {
        router,
        local,
        edge,
        cloud,
        usage,
    }
}

#[tokio::test]
async fn local_timeout_falls_back_to_cloud() {
    let f = fixture(
        Some(MockBackend::new(BackendKind::Local).then(MockReply::Timeout)),
        None,
        Some(
            MockBackend::new(BackendKind::Cloud)
                .with_replies(["Your invoice lists two services and tax."]),
        ),
        RoutingPolicy::default(),
    );

    let (text, decision) = f
        .router
        .generate_response(&caller(), "explain my invoice", None)
        .await;

    assert_eq!(text, "Your invoice lists two services and tax.");
    assert_eq!(decision.backend, BackendType::Cloud);
    assert!(decision.reason.to_lowercase().contains("fallback"));
    assert_eq!(decision.complexity, QueryComplexity::Complex);

    // The failed local turn was rolled back; cloud holds the exchange.
    let local = f.local.unwrap();
    let cloud = f.cloud.unwrap();
    assert!(local.transcripts().is_empty(&caller()).await);
    assert_eq!(cloud.transcripts().len(&caller()).await, 2);
    assert_eq!(f.usage.count(BackendType::Cloud), 1);
}

#[tokio::test]
async fn only_edge_available_routes_moderate_to_edge_smart() {
    let f = fixture(
        Some(MockBackend::new(BackendKind::Local).unavailable()),
        Some(MockBackend::new(BackendKind::Edge).with_replies(["We have Tuesday at 10."])),
        None,
        RoutingPolicy::default(),
    );

    let (text, decision) = f
        .router
        .generate_response(&caller(), "Can I book an appointment", None)
        .await;

    assert_eq!(text, "We have Tuesday at 10.");
    assert_eq!(decision.backend, BackendType::EdgeSmart);
    assert_eq!(decision.model.as_deref(), Some("llama-3.1-8b"));
    let sent = f.edge.unwrap().last_request().await.unwrap();
    assert_eq!(sent.model.as_deref(), Some("llama-3.1-8b"));
}

#[tokio::test]
async fn successful_turn_records_user_and_assistant() {
    let f = fixture(
        Some(MockBackend::new(BackendKind::Local).with_replies(["Hi! How can I help?"])),
        None,
        Some(MockBackend::new(BackendKind::Cloud)),
        RoutingPolicy::default(),
    );

    let (text, decision) = f.router.generate_response(&caller(), "hello", None).await;
    assert_eq!(decision.backend, BackendType::FastLocal);
    assert_eq!(decision.model.as_deref(), Some("quick-responder:latest"));

    let turns = f.local.unwrap().transcripts().snapshot(&caller()).await;
    assert_eq!(
        &turns[turns.len() - 2..],
        &[
            ConversationTurn::user("hello"),
            ConversationTurn::assistant(text)
        ]
    );
}

#[tokio::test]
async fn adapter_error_retries_once_on_cloud() {
    let f = fixture(
        Some(MockBackend::new(BackendKind::Local).failing_generate()),
        None,
        Some(MockBackend::new(BackendKind::Cloud).with_replies(["It shipped this morning."])),
        RoutingPolicy::default(),
    );

    let (text, decision) = f
        .router
        .generate_response(&caller(), "What's the status of my order", None)
        .await;

    assert_eq!(text, "It shipped this morning.");
    assert_eq!(decision.backend, BackendType::Cloud);
    assert_eq!(decision.reason, "Fallback to cloud after chat_local error");
    assert_eq!(decision.complexity, QueryComplexity::Moderate);
}

#[tokio::test]
async fn total_failure_apologizes_with_resolved_decision() {
    let f = fixture(
        Some(MockBackend::new(BackendKind::Local).failing_generate()),
        None,
        Some(MockBackend::new(BackendKind::Cloud).failing_generate()),
        RoutingPolicy::default(),
    );

    let (text, decision) = f
        .router
        .generate_response(&caller(), "explain my invoice", None)
        .await;

    assert_eq!(text, APOLOGY_REPLY);
    assert_eq!(decision.backend, BackendType::SmartLocal);
    assert_eq!(decision.model.as_deref(), Some("llama3.3:70b"));
    assert_eq!(f.usage.total(), 0);
}

#[tokio::test]
async fn cloud_error_is_not_retried() {
    let f = fixture(
        Some(MockBackend::new(BackendKind::Local).unavailable()),
        None,
        Some(MockBackend::new(BackendKind::Cloud).failing_generate()),
        RoutingPolicy::default(),
    );

    let (text, decision) = f.router.generate_response(&caller(), "hello", None).await;
    assert_eq!(text, APOLOGY_REPLY);
    assert_eq!(decision.backend, BackendType::Cloud);
    assert_eq!(decision.reason, "Only cloud model available");
}

#[tokio::test]
async fn hybrid_short_reply_falls_back_to_cloud() {
    let f = fixture(
        Some(MockBackend::new(BackendKind::Local).with_replies(["ok"])),
        None,
        Some(MockBackend::new(BackendKind::Cloud).with_replies([
            "Ceramic pads last longer but cost more than organic ones.",
        ])),
        RoutingPolicy::default(),
    );

    let (text, decision) = f
        .router
        .generate_response(&caller(), "compare ceramic and organic brake pads", None)
        .await;

    assert!(text.starts_with("Ceramic pads"));
    assert_eq!(decision.backend, BackendType::Cloud);
    assert_eq!(decision.reason, "Hybrid fallback to cloud model");
    assert!(decision.model.is_none());
    assert_eq!(f.cloud.unwrap().chat_calls().await, 1);
}

#[tokio::test]
async fn hybrid_good_reply_resolves_to_smart_local() {
    let f = fixture(
        Some(MockBackend::new(BackendKind::Local).with_replies([
            "Ceramic pads are quieter and last longer.",
        ])),
        None,
        Some(MockBackend::new(BackendKind::Cloud)),
        RoutingPolicy::default(),
    );

    let (_, decision) = f
        .router
        .generate_response(&caller(), "compare ceramic and organic brake pads", None)
        .await;

    assert_eq!(decision.backend, BackendType::SmartLocal);
    assert_eq!(f.cloud.unwrap().chat_calls().await, 0);
    assert_eq!(f.usage.count(BackendType::SmartLocal), 1);
}

#[tokio::test]
async fn hybrid_without_cloud_keeps_primary_text() {
    let f = fixture(
        Some(MockBackend::new(BackendKind::Local).with_replies(["Hmm."])),
        Some(MockBackend::new(BackendKind::Edge)),
        None,
        RoutingPolicy::default(),
    );

    let (text, decision) = f
        .router
        .generate_response(&caller(), "why is my engine light on", None)
        .await;

    assert_eq!(text, "Hmm.");
    assert_eq!(decision.backend, BackendType::SmartLocal);
}

#[tokio::test]
async fn nothing_available_still_tries_cloud() {
    let f = fixture(
        Some(MockBackend::new(BackendKind::Local).unavailable()),
        None,
        Some(MockBackend::new(BackendKind::Cloud).unavailable().with_replies(["Sure."])),
        RoutingPolicy::default(),
    );

    let (text, decision) = f.router.generate_response(&caller(), "hello", None).await;
    assert_eq!(text, "Sure.");
    assert_eq!(decision.backend, BackendType::Cloud);
    assert!(decision.reason.starts_with("No backends confirmed available"));
}

#[tokio::test]
async fn nothing_configured_apologizes() {
    let f = fixture(None, None, None, RoutingPolicy::default());
    let (text, decision) = f.router.generate_response(&caller(), "hello", None).await;
    assert_eq!(text, APOLOGY_REPLY);
    assert_eq!(decision.backend, BackendType::Cloud);
}

#[tokio::test]
async fn empty_local_reply_apologizes_without_counting() {
    let f = fixture(
        Some(MockBackend::new(BackendKind::Local).then(MockReply::Error("503".into()))),
        None,
        Some(MockBackend::new(BackendKind::Cloud)),
        RoutingPolicy::default(),
    );

    let (text, decision) = f.router.generate_response(&caller(), "hello", None).await;
    assert_eq!(text, APOLOGY_REPLY);
    assert_eq!(decision.backend, BackendType::FastLocal);
    assert_eq!(f.usage.total(), 0);
}

#[tokio::test]
async fn system_prompt_reaches_the_adapter() {
    let f = fixture(
        Some(MockBackend::new(BackendKind::Local)),
        None,
        None,
        RoutingPolicy::default(),
    );

    f.router
        .generate_response(&caller(), "hello", Some("You are an SMS assistant."))
        .await;
    let sent = f.local.unwrap().last_request().await.unwrap();
    assert_eq!(sent.system, "You are an SMS assistant.");
}

#[tokio::test]
async fn reset_then_summary_reports_no_history() {
    let f = fixture(
        Some(MockBackend::new(BackendKind::Local)),
        Some(MockBackend::new(BackendKind::Edge)),
        Some(MockBackend::new(BackendKind::Cloud)),
        RoutingPolicy::default(),
    );

    f.router.generate_response(&caller(), "hello", None).await;
    f.router.reset_conversations(&caller());

    assert_eq!(
        f.router.get_conversation_summary(&caller()).await,
        "No conversation history."
    );
    // No summary request was made.
    assert_eq!(f.local.unwrap().chat_calls().await, 1);
}

#[tokio::test]
async fn summary_comes_from_first_adapter_with_history() {
    let f = fixture(
        Some(MockBackend::new(BackendKind::Local).unavailable()),
        Some(MockBackend::new(BackendKind::Edge).with_replies([
            "Hello there!",
            "Caller said hello.",
        ])),
        None,
        RoutingPolicy::default(),
    );

    f.router.generate_response(&caller(), "hello", None).await;
    let summary = f.router.get_conversation_summary(&caller()).await;

    assert_eq!(summary, "Caller said hello.");
    assert_eq!(f.local.unwrap().chat_calls().await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn callers_do_not_share_transcripts() {
    let f = fixture(
        Some(MockBackend::new(BackendKind::Local)),
        None,
        None,
        RoutingPolicy::default(),
    );
    let alice = ConversationId::voice("+14155550101");
    let bob = ConversationId::voice("+14155550102");

    tokio::join!(
        f.router.generate_response(&alice, "hello", None),
        f.router.generate_response(&bob, "hi", None),
    );
    f.router.generate_response(&alice, "thanks", None).await;

    let local = f.local.unwrap();
    assert_eq!(local.transcripts().len(&alice).await, 4);
    assert_eq!(local.transcripts().len(&bob).await, 2);
    assert_eq!(local.transcripts().snapshot(&bob).await[0].content, "hi");
}

#[tokio::test]
async fn usage_counts_final_backends() {
    let f = fixture(
        Some(MockBackend::new(BackendKind::Local).with_replies(["Hi!", "ok"])),
        None,
        Some(MockBackend::new(BackendKind::Cloud)),
        RoutingPolicy::default(),
    );

    f.router.generate_response(&caller(), "hello", None).await;
    f.router
        .generate_response(&caller(), "explain the warranty", None)
        .await;

    let report = f.usage.report();
    assert_eq!(report.total_requests, 2);
    assert_eq!(f.usage.count(BackendType::FastLocal), 1);
    assert_eq!(f.usage.count(BackendType::Cloud), 1);
    assert!(
        report
            .backends
            .iter()
            .all(|b| (b.percentage - 50.0).abs() < f64::EPSILON)
    );
}

/// Whatever the availability and failure mix, callers get text and the
/// decision never names a hybrid intent.
#[tokio::test]
async fn decisions_are_always_concrete() {
    let utterances = [
        "hello",
        "Can I book an appointment",
        "explain my invoice",
        "purple monkey dishwasher",
    ];
    let local_outcomes = [
        Some(MockReply::Text("Here you go, all set.".into())),
        Some(MockReply::Text("ok".into())),
        Some(MockReply::Timeout),
        None,
    ];

    for local_up in [true, false] {
        for edge_up in [None, Some(true), Some(false)] {
            for cloud_configured in [true, false] {
                for outcome in &local_outcomes {
                    for prefer_edge in [true, false] {
                        for utterance in utterances {
                            let mut local = MockBackend::new(BackendKind::Local);
                            local = match outcome {
                                Some(reply) => local.then(reply.clone()),
                                None => local.failing_generate(),
                            };
                            if !local_up {
                                local = local.unavailable();
                            }
                            let edge = edge_up.map(|up| {
                                let edge = MockBackend::new(BackendKind::Edge);
                                if up { edge } else { edge.unavailable() }
                            });
                            let cloud =
                                cloud_configured.then(|| MockBackend::new(BackendKind::Cloud));
                            let f = fixture(
                                Some(local),
                                edge,
                                cloud,
                                RoutingPolicy {
                                    prefer_local: true,
                                    prefer_edge,
                                },
                            );

                            let (text, decision) =
                                f.router.generate_response(&caller(), utterance, None).await;
                            assert!(!text.trim().is_empty());
                            assert!(
                                !decision.backend.is_hybrid(),
                                "hybrid leaked for {utterance:?}: {decision:?}"
                            );
                        }
                    }
                }
            }
        }
    }
}
