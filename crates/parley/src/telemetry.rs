// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus recorder for the `metrics` facade.
//!
//! The router and assistant record through `metrics::counter!` and friends;
//! this module installs the process-wide recorder behind those macros and
//! hands the gateway a render function for `GET /metrics`.

use std::sync::Arc;

use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use parley_core::ParleyError;
use parley_gateway::MetricsRender;

/// Installs the global Prometheus recorder and describes every Parley metric.
///
/// Only one recorder can be installed per process; a second call errors.
pub fn install_prometheus() -> Result<PrometheusHandle, ParleyError> {
    let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
        ParleyError::Internal(format!("failed to install Prometheus recorder: {e}"))
    })?;
    describe_all();
    tracing::info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Wraps `handle` as the gateway's `/metrics` renderer.
pub fn render_fn(handle: PrometheusHandle) -> MetricsRender {
    Arc::new(move || handle.render())
}

fn describe_all() {
    parley_router::register_metrics();
    describe_counter!("parley_calls_total", "Voice calls answered");
    describe_gauge!("parley_active_calls", "Voice calls currently in progress");
}
