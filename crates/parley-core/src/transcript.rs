// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded conversation transcripts, kept per conversation.
//!
//! Each backend adapter owns one [`TranscriptStore`]: an arena of transcripts
//! keyed by [`ConversationId`]. A generation turn checks out the caller's
//! transcript and holds its lock across the provider call, so turns from one
//! caller are applied in arrival order and two callers never see each other's
//! context.
//!
//! Conversations that go quiet (SMS threads, calls whose status callback
//! never arrived) are dropped by [`TranscriptStore::expire_idle`].

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;

use crate::types::{ConversationId, ConversationTurn, Role};

/// Ordered, length-bounded list of turns for one conversation.
#[derive(Debug, Clone)]
pub struct Transcript {
    turns: Vec<ConversationTurn>,
    max_turns: usize,
    last_active: Instant,
}

impl Transcript {
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: Vec::new(),
            max_turns: max_turns.max(1),
            last_active: Instant::now(),
        }
    }

    /// Appends a user turn and evicts the oldest turns, a pair at a time,
    /// until the transcript fits in `max_turns`. The new turn is never evicted.
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(ConversationTurn::user(content));
        while self.turns.len() > self.max_turns && self.turns.len() > 1 {
            let evict = 2.min(self.turns.len() - 1);
            self.turns.drain(..evict);
        }
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.turns.push(ConversationTurn::assistant(content));
    }

    /// Removes the trailing user turn, if there is one. Used when a provider
    /// call fails so the failed turn never becomes context.
    pub fn rollback_user(&mut self) -> Option<ConversationTurn> {
        match self.turns.last() {
            Some(turn) if turn.role == Role::User => self.turns.pop(),
            _ => None,
        }
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Time since the transcript was last checked out.
    pub fn idle_for(&self) -> Duration {
        self.last_active.elapsed()
    }
}

/// Arena of transcripts keyed by conversation.
#[derive(Debug)]
pub struct TranscriptStore {
    max_turns: usize,
    conversations: DashMap<ConversationId, Arc<Mutex<Transcript>>>,
}

impl TranscriptStore {
    /// Creates an empty store whose transcripts retain at most `max_turns` turns
    /// before the newest exchange.
    pub fn new(max_turns: usize) -> Self {
        Self {
            max_turns,
            conversations: DashMap::new(),
        }
    }

    /// Locks the transcript for `id`, creating an empty one on first use.
    ///
    /// The guard is owned so it can be held across the provider call.
    pub async fn checkout(&self, id: &ConversationId) -> OwnedMutexGuard<Transcript> {
        let slot = Arc::clone(
            &*self
                .conversations
                .entry(id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(Transcript::new(self.max_turns)))),
        );
        let mut transcript = slot.lock_owned().await;
        transcript.last_active = Instant::now();
        transcript
    }

    /// Drops the transcript for `id`. The next turn starts from an empty history.
    pub fn reset(&self, id: &ConversationId) {
        self.conversations.remove(id);
    }

    /// Copies the current turns for `id` (empty when the conversation is unknown).
    pub async fn snapshot(&self, id: &ConversationId) -> Vec<ConversationTurn> {
        let slot = self.conversations.get(id).map(|s| Arc::clone(&*s));
        match slot {
            Some(slot) => slot.lock().await.turns().to_vec(),
            None => Vec::new(),
        }
    }

    pub async fn len(&self, id: &ConversationId) -> usize {
        let slot = self.conversations.get(id).map(|s| Arc::clone(&*s));
        match slot {
            Some(slot) => slot.lock().await.len(),
            None => 0,
        }
    }

    pub async fn is_empty(&self, id: &ConversationId) -> bool {
        self.len(id).await == 0
    }

    /// Number of conversations currently holding a transcript.
    pub fn conversation_count(&self) -> usize {
        self.conversations.len()
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Drops every transcript idle for at least `max_idle` and returns how
    /// many were dropped.
    ///
    /// Slots that are locked, or that a pending checkout already holds, are
    /// kept regardless of age.
    pub fn expire_idle(&self, max_idle: Duration) -> usize {
        let before = self.conversations.len();
        self.conversations.retain(|_, slot| {
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            match slot.try_lock() {
                Ok(transcript) => transcript.idle_for() < max_idle,
                Err(_) => true,
            }
        });
        before.saturating_sub(self.conversations.len())
    }
}
