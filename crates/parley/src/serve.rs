// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parley serve` command implementation.
//!
//! Wires the configured AI backends into the router, builds the CRM,
//! Twilio provider and phone assistant, then serves the webhooks until a
//! shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;

use parley_agent::PhoneAssistant;
use parley_anthropic::AnthropicAdapter;
use parley_config::ParleyConfig;
use parley_config::model::AgentConfig;
use parley_core::{BackendAdapter, CustomerStore, ParleyError, Telephony, mask_phone_number};
use parley_crm::InMemoryCrm;
use parley_edge::EdgeAdapter;
use parley_gateway::{GatewayState, HealthInfo, SignatureConfig, build_router, shutdown_signal};
use parley_ollama::OllamaAdapter;
use parley_router::{Backends, Router, UsageStats};
use parley_twilio::TwilioTelephony;
use tracing::{debug, info, warn};

use crate::telemetry;

/// Upper bound on the time between idle sweeps.
const MAX_SWEEP_PERIOD: Duration = Duration::from_secs(60);

/// Builds one adapter per configured backend.
///
/// - local: whenever `ollama.url` is non-empty
/// - edge: when `edge.enabled`
/// - cloud: when an Anthropic key resolves from config or environment
pub fn build_backends(config: &ParleyConfig) -> Result<Backends, ParleyError> {
    let mut backends = Backends::default();

    if config.ollama.url.trim().is_empty() {
        info!("ollama.url is empty, local backend disabled");
    } else {
        backends.local = Some(Arc::new(OllamaAdapter::new(config)?) as Arc<dyn BackendAdapter>);
    }

    if config.edge.enabled {
        backends.edge = Some(Arc::new(EdgeAdapter::new(config)?) as Arc<dyn BackendAdapter>);
    }

    if config.resolve_anthropic_key().is_some() {
        backends.cloud =
            Some(Arc::new(AnthropicAdapter::new(config)?) as Arc<dyn BackendAdapter>);
    } else {
        warn!("no Anthropic API key, cloud backend disabled");
    }

    Ok(backends)
}

/// Runs the `parley serve` command.
pub async fn run_serve(config: ParleyConfig) -> Result<(), ParleyError> {
    init_tracing(effective_log_level(&config.agent));

    info!(version = env!("CARGO_PKG_VERSION"), "starting parley serve");
    let prometheus_render = match telemetry::install_prometheus() {
        Ok(handle) => Some(telemetry::render_fn(handle)),
        Err(e) => {
            warn!(error = %e, "prometheus initialization failed, continuing without metrics");
            None
        }
    };

    let backends = build_backends(&config)?;
    let configured = backends.configured_names();
    if configured.is_empty() {
        warn!("no AI backends configured, every reply will be an apology");
    }
    info!(backends = ?configured, "backends configured");

    let router = Arc::new(Router::from_config(
        backends,
        &config,
        Arc::new(UsageStats::new()),
    ));
    let availability = router.availability().await;
    info!(
        local = availability.local,
        edge = availability.edge,
        cloud = availability.cloud,
        "initial backend availability"
    );

    let crm: Arc<dyn CustomerStore> = Arc::new(InMemoryCrm::new());
    let telephony: Arc<dyn Telephony> = Arc::new(TwilioTelephony::from_config(&config)?);
    if let Some(number) = &config.twilio.phone_number {
        info!(phone_number = %mask_phone_number(number), "twilio provider ready");
    }

    let assistant = Arc::new(PhoneAssistant::from_config(
        &config,
        Arc::clone(&router),
        crm,
        telephony,
    ));

    let signature = SignatureConfig::from_config(&config.twilio);
    if signature.is_none() {
        warn!("webhook signature validation is off");
    }

    let max_idle = Duration::from_secs(config.routing.conversation_idle_secs);
    let sweeper = tokio::spawn(sweep_idle(Arc::clone(&assistant), max_idle));

    let state = GatewayState {
        assistant,
        health: HealthInfo::new(config.twilio.phone_number.is_some()),
        prometheus_render,
    };
    let app = build_router(state, signature);

    let served = parley_gateway::start_server(&config.server, app, shutdown_signal()).await;
    sweeper.abort();
    served?;

    let usage = router.usage().report();
    info!(total_requests = usage.total_requests, "parley serve stopped");
    Ok(())
}

/// Periodically drops conversations and calls idle for `max_idle`.
async fn sweep_idle(assistant: Arc<PhoneAssistant>, max_idle: Duration) {
    let mut interval = tokio::time::interval(sweep_period(max_idle));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // Skip the first immediate tick.
    interval.tick().await;

    loop {
        interval.tick().await;
        let sweep = assistant.expire_idle(max_idle);
        debug!(
            transcripts = sweep.transcripts,
            calls = sweep.calls,
            active_calls = assistant.active_call_count(),
            "idle sweep finished"
        );
    }
}

fn sweep_period(max_idle: Duration) -> Duration {
    max_idle.min(MAX_SWEEP_PERIOD).max(Duration::from_secs(1))
}

/// `agent.debug` forces debug logging regardless of `agent.log_level`.
pub fn effective_log_level(agent: &AgentConfig) -> &str {
    if agent.debug { "debug" } else { &agent.log_level }
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `parley` crates log at `log_level`
/// and everything else at `warn`.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(log_level)));

    // A second init (tests, probe after serve) is a no-op.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .try_init();
}

fn default_filter(log_level: &str) -> String {
    let level = log_level.to_lowercase();
    [
        "parley",
        "parley_core",
        "parley_config",
        "parley_router",
        "parley_anthropic",
        "parley_ollama",
        "parley_edge",
        "parley_twilio",
        "parley_crm",
        "parley_agent",
        "parley_gateway",
    ]
    .iter()
    .map(|target| format!("{target}={level}"))
    .chain(std::iter::once("warn".to_string()))
    .collect::<Vec<_>>()
    .join(",")
}
