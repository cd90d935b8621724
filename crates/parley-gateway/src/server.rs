// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the Twilio webhooks.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router, middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use parley_agent::PhoneAssistant;
use parley_config::model::ServerConfig;
use parley_core::ParleyError;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::error;

use crate::auth::{SignatureConfig, signature_middleware};
use crate::handlers::{self, PROCESS_ERROR_TWIML, xml};

/// Facts reported by `/health` that do not change while serving.
#[derive(Debug, Clone)]
pub struct HealthInfo {
    pub start_time: Instant,
    pub version: &'static str,
    pub phone_number_configured: bool,
}

impl HealthInfo {
    pub fn new(phone_number_configured: bool) -> Self {
        Self {
            start_time: Instant::now(),
            version: env!("CARGO_PKG_VERSION"),
            phone_number_configured,
        }
    }
}

/// Renders the Prometheus exposition text for `GET /metrics`.
pub type MetricsRender = Arc<dyn Fn() -> String + Send + Sync>;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub assistant: Arc<PhoneAssistant>,
    pub health: HealthInfo,
    /// `None` when no recorder is installed; `/metrics` then answers 404.
    pub prometheus_render: Option<MetricsRender>,
}

/// Builds the webhook router.
///
/// - GET /, /health, /usage, /metrics (never signature-checked)
/// - POST /voice/incoming, /voice/process, /voice/status, /sms/incoming
///   (signature-checked when `signature` is set)
pub fn build_router(state: GatewayState, signature: Option<SignatureConfig>) -> Router {
    let public_routes = Router::new()
        .route("/", get(handlers::get_root))
        .route("/health", get(handlers::get_health))
        .route("/usage", get(handlers::get_usage))
        .route("/metrics", get(handlers::get_metrics))
        .with_state(state.clone());

    let mut webhook_routes = Router::new()
        .route("/voice/incoming", post(handlers::post_voice_incoming))
        .route("/voice/process", post(handlers::post_voice_process))
        .route("/voice/status", post(handlers::post_voice_status))
        .route("/sms/incoming", post(handlers::post_sms_incoming));

    if let Some(signature) = signature {
        webhook_routes = webhook_routes.route_layer(axum_middleware::from_fn_with_state(
            signature,
            signature_middleware,
        ));
    }

    Router::new()
        .merge(public_routes)
        .merge(webhook_routes.with_state(state))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
}

/// A panicking handler still answers the caller instead of dropping the call.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    error!(panic = %detail, "handler panicked");
    xml(PROCESS_ERROR_TWIML.to_string()).into_response()
}

/// Binds `host:port` and serves until `shutdown` resolves.
pub async fn start_server(
    config: &ServerConfig,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ParleyError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ParleyError::Internal(format!("failed to bind webhook server to {addr}: {e}")))?;

    tracing::info!("Webhook server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ParleyError::Internal(format!("webhook server error: {e}")))?;

    tracing::info!("Webhook server stopped");
    Ok(())
}

/// Resolves on Ctrl-C (or SIGTERM on unix).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
