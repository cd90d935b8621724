// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-routing-decision backend liveness probing.

use std::sync::Arc;
use std::time::Duration;

use parley_core::{BackendAdapter, HealthStatus};
use serde::Serialize;
use tracing::debug;

/// The configured adapters, one optional slot per backend kind.
#[derive(Clone, Default)]
pub struct Backends {
    pub local: Option<Arc<dyn BackendAdapter>>,
    pub edge: Option<Arc<dyn BackendAdapter>>,
    pub cloud: Option<Arc<dyn BackendAdapter>>,
}

impl Backends {
    /// Configured adapters in summary-preference order: local, edge, cloud.
    pub fn configured(&self) -> impl Iterator<Item = &Arc<dyn BackendAdapter>> {
        [&self.local, &self.edge, &self.cloud]
            .into_iter()
            .filter_map(Option::as_ref)
    }

    /// Names of the configured slots (`local`, `edge`, `cloud`).
    pub fn configured_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.local.is_some() {
            names.push("local");
        }
        if self.edge.is_some() {
            names.push("edge");
        }
        if self.cloud.is_some() {
            names.push("cloud");
        }
        names
    }
}

impl std::fmt::Debug for Backends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backends")
            .field("local", &self.local.as_ref().map(|a| a.name().to_string()))
            .field("edge", &self.edge.as_ref().map(|a| a.name().to_string()))
            .field("cloud", &self.cloud.as_ref().map(|a| a.name().to_string()))
            .finish()
    }
}

/// Availability of each backend slot, recomputed for every routing decision.
/// Unconfigured slots are always `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Availability {
    pub local: bool,
    pub edge: bool,
    pub cloud: bool,
}

impl Availability {
    pub fn available_count(&self) -> usize {
        [self.local, self.edge, self.cloud]
            .into_iter()
            .filter(|up| *up)
            .count()
    }

    pub fn none(&self) -> bool {
        self.available_count() == 0
    }
}

/// Runs short-timeout liveness checks.
///
/// Probe failures never propagate: an error, an `Unhealthy` status or a
/// timeout all read as "unavailable".
#[derive(Debug, Clone)]
pub struct AvailabilityProber {
    timeout: Duration,
}

impl AvailabilityProber {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Probe one adapter.
    pub async fn probe(&self, adapter: &dyn BackendAdapter) -> bool {
        match tokio::time::timeout(self.timeout, adapter.health_check()).await {
            Ok(Ok(status)) => {
                if let HealthStatus::Unhealthy(reason) = &status {
                    debug!(backend = adapter.name(), %reason, "backend unhealthy");
                }
                status.is_available()
            }
            Ok(Err(e)) => {
                debug!(backend = adapter.name(), error = %e, "health check failed");
                false
            }
            Err(_) => {
                debug!(
                    backend = adapter.name(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "health check timed out"
                );
                false
            }
        }
    }

    /// Probe every configured adapter concurrently.
    pub async fn snapshot(&self, backends: &Backends) -> Availability {
        let (local, edge, cloud) = tokio::join!(
            self.probe_slot(backends.local.as_deref()),
            self.probe_slot(backends.edge.as_deref()),
            self.probe_slot(backends.cloud.as_deref()),
        );
        Availability { local, edge, cloud }
    }

    async fn probe_slot(&self, adapter: Option<&dyn BackendAdapter>) -> bool {
        match adapter {
            Some(adapter) => self.probe(adapter).await,
            None => false,
        }
    }
}

impl Default for AvailabilityProber {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}
