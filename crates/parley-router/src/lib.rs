// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AI backend routing engine for the Parley phone assistant.
//!
//! This crate provides:
//! - [`QueryClassifier`]: pattern-based complexity tiers plus appointment detection
//! - [`AvailabilityProber`]: concurrent, short-timeout liveness checks
//! - [`Router`]: backend selection, dispatch, and bounded hybrid fallback
//! - [`UsageStats`]: per-backend response counters
//!
//! Every utterance is classified, the configured adapters are probed, and the
//! routing precedence picks one backend and model. A hybrid decision whose
//! primary reply is unusable is re-dispatched once; an adapter error is
//! retried once on the cloud backend. Callers always get text back.

pub mod availability;
pub mod classifier;
pub mod router;
pub mod usage;

pub use availability::{Availability, AvailabilityProber, Backends};
pub use classifier::{QueryClassifier, QueryComplexity};
pub use router::{
    APOLOGY_REPLY, BackendType, ModelCatalog, Router, RoutingDecision, RoutingPolicy,
};
pub use usage::{BackendUsage, UsageReport, UsageStats, register_metrics};
