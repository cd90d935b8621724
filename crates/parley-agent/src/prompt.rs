// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! System prompts and end-of-call detection.

use std::fmt::Write;

use parley_config::model::AgentConfig;
use parley_core::types::Customer;

/// Base prompt for voice turns.
pub const VOICE_BASE_PROMPT: &str = "You are a helpful phone assistant handling customer inquiries. \
You can help with appointment scheduling, status updates, and general questions. \
Be professional, friendly, and concise in your responses as this is a phone conversation. \
Keep responses brief and to the point.";

/// Prompt for SMS threads.
pub const SMS_PROMPT: &str = "You are a helpful SMS assistant. Provide brief, concise responses \
suitable for text messaging. Keep responses under 160 characters when possible.";

/// A reply containing any of these (case-insensitively) ends the call.
pub const ENDING_PHRASES: &[&str] = &[
    "goodbye",
    "thank you for calling",
    "have a great day",
    "have a nice day",
    "take care",
    "talk to you later",
];

pub fn is_ending_phrase(reply: &str) -> bool {
    let lower = reply.to_lowercase();
    ENDING_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

/// Assembles the voice system prompt from business and caller context.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    business_name: Option<String>,
    business_type: Option<String>,
    business_hours: Option<String>,
}

impl PromptBuilder {
    pub fn from_config(agent: &AgentConfig) -> Self {
        let non_blank = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());
        Self {
            business_name: non_blank(&agent.business_name),
            business_type: non_blank(&agent.business_type),
            business_hours: non_blank(&agent.business_hours),
        }
    }

    pub fn voice_prompt(&self, customer: Option<&Customer>) -> String {
        let mut prompt = String::from(VOICE_BASE_PROMPT);

        if let Some(name) = &self.business_name {
            let _ = write!(prompt, "\n\nYou answer calls for {name}");
            if let Some(kind) = &self.business_type {
                let _ = write!(prompt, ", a {kind}");
            }
            prompt.push('.');
        }
        if let Some(hours) = &self.business_hours {
            let _ = write!(prompt, "\nBusiness hours: {hours}");
        }

        if let Some(customer) = customer {
            let _ = write!(prompt, "\n\nCurrent caller: {}", customer.name);
            if let Some(email) = customer.email.as_deref().filter(|e| !e.is_empty()) {
                let _ = write!(prompt, "\nEmail: {email}");
            }
        }
        prompt
    }
}
