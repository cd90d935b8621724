// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-lifetime backend usage counters.
//!
//! Counts are kept locally for the `/usage` report and mirrored to the
//! `metrics` facade so any installed recorder can scrape them.

use dashmap::DashMap;
use metrics::{describe_counter, describe_histogram};
use serde::Serialize;

use crate::router::BackendType;

/// Register the router's metric descriptions. Call once after installing a recorder.
pub fn register_metrics() {
    describe_counter!(
        "parley_backend_responses_total",
        "Responses produced, by the backend that produced them"
    );
    describe_counter!(
        "parley_backend_fallbacks_total",
        "Requests re-dispatched to a fallback backend"
    );
    describe_histogram!(
        "parley_response_latency_seconds",
        "End-to-end routed response latency in seconds"
    );
}

/// Monotonic per-backend response counters.
#[derive(Debug, Default)]
pub struct UsageStats {
    counts: DashMap<BackendType, u64>,
}

impl UsageStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one response produced by `backend`.
    pub fn record(&self, backend: BackendType) {
        *self.counts.entry(backend).or_insert(0) += 1;
        metrics::counter!("parley_backend_responses_total", "backend" => backend.to_string())
            .increment(1);
    }

    pub fn count(&self, backend: BackendType) -> u64 {
        self.counts.get(&backend).map(|c| *c).unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|entry| *entry.value()).sum()
    }

    /// Counts with percentages derived at read time, busiest backend first.
    pub fn report(&self) -> UsageReport {
        let total = self.total();
        let mut backends: Vec<BackendUsage> = self
            .counts
            .iter()
            .map(|entry| BackendUsage {
                backend: *entry.key(),
                count: *entry.value(),
                percentage: percentage(*entry.value(), total),
            })
            .collect();
        backends.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.backend.to_string().cmp(&b.backend.to_string()))
        });
        UsageReport {
            total_requests: total,
            backends,
        }
    }
}

fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    // One decimal place.
    (count as f64 * 1000.0 / total as f64).round() / 10.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageReport {
    pub total_requests: u64,
    pub backends: Vec<BackendUsage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendUsage {
    pub backend: BackendType,
    pub count: u64,
    pub percentage: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report() {
        let report = UsageStats::new().report();
        assert_eq!(report.total_requests, 0);
        assert!(report.backends.is_empty());
    }

    #[test]
    fn percentages_are_derived_on_read() {
        let stats = UsageStats::new();
        stats.record(BackendType::FastLocal);
        stats.record(BackendType::FastLocal);
        stats.record(BackendType::Cloud);

        let report = stats.report();
        assert_eq!(report.total_requests, 3);
        assert_eq!(report.backends[0].backend, BackendType::FastLocal);
        assert_eq!(report.backends[0].percentage, 66.7);
        assert_eq!(report.backends[1].percentage, 33.3);

        stats.record(BackendType::Cloud);
        let report = stats.report();
        assert_eq!(stats.count(BackendType::Cloud), 2);
        assert_eq!(report.backends[0].percentage, 50.0);
    }

    #[test]
    fn report_serializes_backend_names() {
        let stats = UsageStats::new();
        stats.record(BackendType::EdgeSmart);
        let json = serde_json::to_value(stats.report()).unwrap();
        assert_eq!(json["backends"][0]["backend"], "edge_smart");
        assert_eq!(json["total_requests"], 1);
    }
}
