// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ollama `/api/chat` wire types.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct ChatPayload {
    pub model: String,
    pub messages: Vec<OllamaMessage>,
    /// Always false: the phone assistant needs the whole reply before speaking.
    pub stream: bool,
    pub options: ChatOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatOptions {
    /// Ollama's name for the response token cap.
    pub num_predict: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OllamaMessage {
    pub role: String,
    pub content: String,
}

/// Non-streaming chat response. Fields other than the message are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub message: Option<OllamaMessage>,
    #[serde(default)]
    pub done: bool,
}

impl ChatResponse {
    /// Reply text, empty when the server sent no message.
    pub fn into_text(self) -> String {
        self.message.map(|m| m.content).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_message_is_empty_text() {
        let response: ChatResponse = serde_json::from_str(r#"{"done": true}"#).unwrap();
        assert_eq!(response.into_text(), "");
    }

    #[test]
    fn payload_uses_num_predict() {
        let payload = ChatPayload {
            model: "quick-responder:latest".into(),
            messages: vec![],
            stream: false,
            options: ChatOptions {
                num_predict: 512,
                temperature: 0.7,
            },
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["options"]["num_predict"], 512);
        assert_eq!(json["stream"], false);
    }
}
