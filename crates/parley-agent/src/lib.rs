// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Phone assistant orchestration for Parley.
//!
//! [`PhoneAssistant`] turns telephony events into routed AI replies:
//! it greets callers (by name when the CRM knows them), answers each
//! utterance through the [`parley_router::Router`], logs interactions and
//! call summaries as CRM notes, and answers SMS threads.

pub mod assistant;
pub mod calls;
pub mod prompt;

pub use assistant::{GENERIC_GREETING, IdleSweep, PhoneAssistant};
pub use calls::{ActiveCall, CallRegistry, CallSnapshot};
pub use prompt::{ENDING_PHRASES, PromptBuilder, SMS_PROMPT, VOICE_BASE_PROMPT, is_ending_phrase};
