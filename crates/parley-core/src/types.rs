// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across collaborator traits and the Parley workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identifies one caller's conversation (the caller's phone number for voice,
/// `sms:<number>` for text threads).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    /// Conversation key for a voice call from `caller`.
    pub fn voice(caller: &str) -> Self {
        Self(caller.to_string())
    }

    /// Conversation key for an SMS thread with `sender`.
    pub fn sms(sender: &str) -> Self {
        Self(format!("sms:{sender}"))
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Speaker of a single conversation turn.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One role-tagged message in a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Health status reported by backend liveness checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Backend is fully operational.
    Healthy,
    /// Backend answers but reports a problem.
    Degraded(String),
    /// Backend is not operational.
    Unhealthy(String),
}

impl HealthStatus {
    /// Whether a router may send traffic to a backend in this state.
    pub fn is_available(&self) -> bool {
        !matches!(self, HealthStatus::Unhealthy(_))
    }
}

/// The closed set of AI provider integrations.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BackendKind {
    /// Local LLM server on the LAN.
    Local,
    /// Edge inference gateway.
    Edge,
    /// Hosted cloud LLM.
    Cloud,
}

/// A single generation request against a backend adapter.
#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    /// The caller's utterance.
    pub message: String,
    /// System prompt; the adapter's phone-brevity default is used when `None`.
    pub system_prompt: Option<String>,
    /// Model override; the adapter's default model is used when `None`.
    pub model: Option<String>,
    /// Response token cap; the adapter default is used when `None`.
    pub max_tokens: Option<u32>,
}

impl GenerateRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt;
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A fully assembled chat call: what an adapter actually sends to its provider.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system: String,
    pub messages: Vec<ConversationTurn>,
    pub model: Option<String>,
    pub max_tokens: u32,
}

// --- Customer store types ---

/// A customer record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Fields for a new customer record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerDraft {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Partial update of a customer record; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// An append-only note attached to a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub customer_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle state of an appointment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Cancelled,
}

/// A booked appointment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub customer_id: String,
    pub scheduled_time: DateTime<Utc>,
    #[serde(default)]
    pub description: Option<String>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// Fields for a new appointment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentDraft {
    pub customer_id: String,
    pub scheduled_time: DateTime<Utc>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Partial update of an appointment; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentUpdate {
    pub scheduled_time: Option<DateTime<Utc>>,
    pub description: Option<String>,
}
