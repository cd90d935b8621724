// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parley probe` command implementation.

use std::time::Duration;

use parley_config::ParleyConfig;
use parley_core::ParleyError;
use parley_router::{Availability, AvailabilityProber};
use serde::Serialize;

use crate::serve::{build_backends, effective_log_level, init_tracing};

#[derive(Debug, Serialize)]
struct ProbeReport {
    configured: Vec<&'static str>,
    available: Availability,
    probe_timeout_secs: u64,
}

/// Probes every configured backend once and prints the result as JSON.
///
/// Returns `Ok(false)` when nothing is reachable.
pub async fn run_probe(config: &ParleyConfig) -> Result<bool, ParleyError> {
    init_tracing(effective_log_level(&config.agent));

    let backends = build_backends(config)?;
    let prober = AvailabilityProber::new(Duration::from_secs(config.routing.probe_timeout_secs));
    let available = prober.snapshot(&backends).await;

    let report = ProbeReport {
        configured: backends.configured_names(),
        available,
        probe_timeout_secs: config.routing.probe_timeout_secs,
    };
    let rendered = serde_json::to_string_pretty(&report)
        .map_err(|e| ParleyError::Internal(format!("failed to render probe report: {e}")))?;
    println!("{rendered}");

    Ok(!available.none())
}
