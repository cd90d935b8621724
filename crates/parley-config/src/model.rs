// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Parley phone assistant.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Parley configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ParleyConfig {
    /// Process behavior and business identity.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Cloud backend (Anthropic Messages API).
    #[serde(default)]
    pub anthropic: AnthropicConfig,

    /// Local backend (Ollama).
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// Edge backend (OpenAI-compatible AI gateway).
    #[serde(default)]
    pub edge: EdgeConfig,

    /// Backend routing policy and timeouts.
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Telephony provider credentials and voice settings.
    #[serde(default)]
    pub twilio: TwilioConfig,

    /// Webhook server bind settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// Process behavior and business identity.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Debug mode: verbose logging of routing decisions.
    #[serde(default)]
    pub debug: bool,

    /// Business name used in greetings and the system prompt.
    #[serde(default)]
    pub business_name: Option<String>,

    /// Business type (auto_shop, salon, medical, general).
    #[serde(default)]
    pub business_type: Option<String>,

    /// Opening hours quoted to callers (e.g. "Mon-Fri 9am-5pm").
    #[serde(default)]
    pub business_hours: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            debug: false,
            business_name: None,
            business_type: None,
            business_hours: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Anthropic API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnthropicConfig {
    /// Anthropic API key. `None` falls back to `ANTHROPIC_API_KEY`; when both
    /// are missing the cloud backend is not configured.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model used for every cloud request.
    #[serde(default = "default_anthropic_model")]
    pub default_model: String,

    /// Value of the `anthropic-version` header.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Response token cap for conversational turns.
    #[serde(default = "default_anthropic_max_tokens")]
    pub max_tokens: u32,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_model: default_anthropic_model(),
            api_version: default_api_version(),
            max_tokens: default_anthropic_max_tokens(),
        }
    }
}

fn default_anthropic_model() -> String {
    "claude-3-5-sonnet-20241022".to_string()
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

fn default_anthropic_max_tokens() -> u32 {
    1024
}

/// Ollama server and model catalog.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OllamaConfig {
    /// Base URL of the Ollama server. Empty disables the local backend.
    #[serde(default = "default_ollama_url")]
    pub url: String,

    /// Model used when a request names none.
    #[serde(default = "default_ollama_fast_model")]
    pub default_model: String,

    /// Small, low-latency model for simple queries and summaries.
    #[serde(default = "default_ollama_fast_model")]
    pub fast_model: String,

    #[serde(default = "default_ollama_general_model")]
    pub general_model: String,

    /// Conversational model for moderate and scheduling queries.
    #[serde(default = "default_ollama_chat_model")]
    pub chat_model: String,

    /// Largest local model, used for complex queries.
    #[serde(default = "default_ollama_smart_model")]
    pub smart_model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: default_ollama_url(),
            default_model: default_ollama_fast_model(),
            fast_model: default_ollama_fast_model(),
            general_model: default_ollama_general_model(),
            chat_model: default_ollama_chat_model(),
            smart_model: default_ollama_smart_model(),
        }
    }
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_fast_model() -> String {
    "quick-responder:latest".to_string()
}

fn default_ollama_general_model() -> String {
    "general-assistant:latest".to_string()
}

fn default_ollama_chat_model() -> String {
    "cyberque-chat:latest".to_string()
}

fn default_ollama_smart_model() -> String {
    "llama3.3:70b".to_string()
}

/// Edge AI gateway and model catalog.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EdgeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Base URL of the OpenAI-compatible gateway.
    #[serde(default = "default_edge_url")]
    pub url: String,

    /// Model used when a request names none (`auto` lets the gateway pick).
    #[serde(default = "default_edge_model")]
    pub default_model: String,

    #[serde(default = "default_edge_fast_model")]
    pub fast_model: String,

    #[serde(default = "default_edge_general_model")]
    pub general_model: String,

    #[serde(default = "default_edge_smart_model")]
    pub smart_model: String,

    /// Sent as the `X-Project` header for gateway-side accounting.
    #[serde(default = "default_edge_project")]
    pub project: String,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: default_edge_url(),
            default_model: default_edge_model(),
            fast_model: default_edge_fast_model(),
            general_model: default_edge_general_model(),
            smart_model: default_edge_smart_model(),
            project: default_edge_project(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_edge_url() -> String {
    "https://ai-gateway.example.com".to_string()
}

fn default_edge_model() -> String {
    "auto".to_string()
}

fn default_edge_fast_model() -> String {
    "llama-3.2-1b".to_string()
}

fn default_edge_general_model() -> String {
    "llama-3.1-8b".to_string()
}

fn default_edge_smart_model() -> String {
    "llama-3.3-70b".to_string()
}

fn default_edge_project() -> String {
    "ai-phone-assistant".to_string()
}

/// Backend routing policy and timeouts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    /// Prefer the local backend over cloud for moderate and complex queries.
    #[serde(default = "default_true")]
    pub prefer_local: bool,

    /// Send simple queries to the edge gateway when it is up.
    #[serde(default)]
    pub prefer_edge: bool,

    /// Generation timeout per provider call.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Liveness probe timeout.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// Maximum retained transcript turns per conversation.
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Seconds without activity before a conversation's transcript (and a
    /// call left open by a lost status callback) is dropped.
    #[serde(default = "default_conversation_idle_secs")]
    pub conversation_idle_secs: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            prefer_local: true,
            prefer_edge: false,
            request_timeout_secs: default_request_timeout_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
            max_history: default_max_history(),
            conversation_idle_secs: default_conversation_idle_secs(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_probe_timeout_secs() -> u64 {
    5
}

fn default_max_history() -> usize {
    20
}

fn default_conversation_idle_secs() -> u64 {
    1800
}

/// Twilio credentials and voice settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TwilioConfig {
    #[serde(default)]
    pub account_sid: Option<String>,

    #[serde(default)]
    pub auth_token: Option<String>,

    /// The assistant's own number in E.164 form (`+14155550100`).
    #[serde(default)]
    pub phone_number: Option<String>,

    /// `<Gather speechTimeout>` value: seconds or `auto`.
    #[serde(default = "default_speech_timeout")]
    pub speech_timeout: String,

    #[serde(default = "default_voice_language")]
    pub voice_language: String,

    /// Verify `X-Twilio-Signature` on every webhook.
    #[serde(default)]
    pub validate_requests: bool,

    /// Externally visible base URL Twilio calls (needed for signature checks).
    #[serde(default)]
    pub public_url: Option<String>,
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            phone_number: None,
            speech_timeout: default_speech_timeout(),
            voice_language: default_voice_language(),
            validate_requests: false,
            public_url: None,
        }
    }
}

fn default_speech_timeout() -> String {
    "auto".to_string()
}

fn default_voice_language() -> String {
    "en-US".to_string()
}

/// Webhook server bind settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl ParleyConfig {
    /// The Anthropic key from config, falling back to `ANTHROPIC_API_KEY`.
    pub fn resolve_anthropic_key(&self) -> Option<String> {
        self.anthropic
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                std::env::var("ANTHROPIC_API_KEY")
                    .ok()
                    .filter(|k| !k.trim().is_empty())
            })
    }

    /// Copy of the configuration with every secret replaced by `***`.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        let mask = |v: &mut Option<String>| {
            if v.is_some() {
                *v = Some("***".to_string());
            }
        };
        mask(&mut copy.anthropic.api_key);
        mask(&mut copy.twilio.auth_token);
        copy
    }
}
