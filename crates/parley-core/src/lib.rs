// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Parley phone assistant.
//!
//! This crate provides the foundational trait definitions, error types, and
//! common types used throughout the Parley workspace. Every AI backend,
//! customer store, and telephony integration implements a trait defined here.

pub mod error;
pub mod redact;
pub mod traits;
pub mod transcript;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::ParleyError;
pub use redact::{mask_phone_number, preview};
pub use transcript::{Transcript, TranscriptStore};
pub use types::{
    BackendKind, ChatRequest, ConversationId, ConversationTurn, GenerateRequest, HealthStatus, Role,
};

// Re-export all collaborator traits at crate root.
pub use traits::{BackendAdapter, CustomerStore, Telephony};
