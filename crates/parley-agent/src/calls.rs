// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registry of in-progress voice calls.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parley_core::types::Customer;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// One caller's live call.
#[derive(Debug)]
pub struct ActiveCall {
    pub customer: Option<Customer>,
    pub started_at: DateTime<Utc>,
    interactions: AtomicU32,
    registered: Instant,
    /// Milliseconds after `registered` of the last utterance.
    last_activity_ms: AtomicU64,
    /// Held for the duration of one utterance (and while the call is wound
    /// down) so a caller's turns never overlap.
    turn_lock: Mutex<()>,
}

impl ActiveCall {
    pub fn new(customer: Option<Customer>) -> Self {
        Self {
            customer,
            started_at: Utc::now(),
            interactions: AtomicU32::new(0),
            registered: Instant::now(),
            last_activity_ms: AtomicU64::new(0),
            turn_lock: Mutex::new(()),
        }
    }

    /// Bumps and returns the interaction count.
    pub fn record_interaction(&self) -> u32 {
        let since = self.registered.elapsed().as_millis();
        self.last_activity_ms
            .store(u64::try_from(since).unwrap_or(u64::MAX), Ordering::Relaxed);
        self.interactions.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn interactions(&self) -> u32 {
        self.interactions.load(Ordering::Relaxed)
    }

    /// Time since the last utterance, or since the call was answered.
    pub fn idle_for(&self) -> Duration {
        let last = Duration::from_millis(self.last_activity_ms.load(Ordering::Relaxed));
        self.registered.elapsed().saturating_sub(last)
    }

    pub async fn lock_turn(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.turn_lock.lock().await
    }

    /// Whole seconds since the call was answered.
    pub fn duration_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds().max(0)
    }

    pub fn snapshot(&self) -> CallSnapshot {
        CallSnapshot {
            customer_id: self.customer.as_ref().map(|c| c.id.clone()),
            started_at: self.started_at,
            interactions: self.interactions(),
        }
    }
}

/// Read-only view of an active call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallSnapshot {
    pub customer_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub interactions: u32,
}

/// Active calls keyed by caller number.
#[derive(Debug, Default)]
pub struct CallRegistry {
    calls: DashMap<String, Arc<ActiveCall>>,
}

impl CallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a call, replacing any stale entry for the same caller.
    pub fn start(&self, caller: &str, customer: Option<Customer>) -> Arc<ActiveCall> {
        let call = Arc::new(ActiveCall::new(customer));
        self.calls.insert(caller.to_string(), Arc::clone(&call));
        self.publish();
        call
    }

    pub fn get(&self, caller: &str) -> Option<Arc<ActiveCall>> {
        self.calls.get(caller).map(|entry| Arc::clone(entry.value()))
    }

    /// Removes `caller`'s call if it is still `call` (a newer call from the
    /// same number is left alone).
    pub fn finish(&self, caller: &str, call: &Arc<ActiveCall>) -> bool {
        let removed = self
            .calls
            .remove_if(caller, |_, current| Arc::ptr_eq(current, call))
            .is_some();
        self.publish();
        removed
    }

    /// Removes calls idle for at least `max_idle` that no handler is using,
    /// returning how many were removed.
    pub fn expire_idle(&self, max_idle: Duration) -> usize {
        let before = self.calls.len();
        self.calls.retain(|_, call| {
            call.idle_for() < max_idle
                || Arc::strong_count(call) > 1
                || call.turn_lock.try_lock().is_err()
        });
        let removed = before.saturating_sub(self.calls.len());
        if removed > 0 {
            self.publish();
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    fn publish(&self) {
        metrics::gauge!("parley_active_calls").set(self.calls.len() as f64);
    }
}
