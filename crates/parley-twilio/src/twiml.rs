// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! TwiML voice responses.
//!
//! Every document the assistant returns is one of four shapes: a greeting
//! that listens for speech, a reply that keeps listening, a reply that hangs
//! up, or a bare `<Say>` for outbound calls.

use std::fmt::Write;

/// Spoken after a greeting when the caller says nothing.
pub const NO_INPUT_GOODBYE: &str = "I didn't receive any input. Goodbye!";

/// Spoken when the caller goes quiet mid-conversation.
pub const STILL_THERE_PROMPT: &str = "Are you still there? Please say something or I'll end the call.";

/// Appended to every reply that ends the call.
pub const CLOSING_LINE: &str = "Thank you for calling. Goodbye!";

/// Greeting used when the assistant has nothing more specific to say.
pub const DEFAULT_GREETING: &str =
    "Hello! Thank you for calling. I'm your AI assistant. How can I help you today?";

/// Webhook that receives transcribed speech.
pub const PROCESS_PATH: &str = "/voice/process";

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Builds TwiML documents with the configured speech recognition settings.
#[derive(Debug, Clone)]
pub struct TwimlBuilder {
    speech_timeout: String,
    language: String,
}

impl TwimlBuilder {
    pub fn new(speech_timeout: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            speech_timeout: speech_timeout.into(),
            language: language.into(),
        }
    }

    /// Greets the caller inside a speech `<Gather>`, then gives up politely.
    pub fn greeting(&self, text: &str) -> String {
        let mut body = self.gather(text);
        say(&mut body, NO_INPUT_GOODBYE);
        body.push_str("<Hangup/>");
        document(&body)
    }

    /// Speaks `text` and keeps listening; a silent caller is prompted and
    /// sent back to the speech webhook.
    pub fn speak_and_continue(&self, text: &str) -> String {
        let mut body = self.gather(text);
        say(&mut body, STILL_THERE_PROMPT);
        let _ = write!(body, r#"<Redirect method="POST">{PROCESS_PATH}</Redirect>"#);
        document(&body)
    }

    /// Speaks `text`, says goodbye, and hangs up.
    pub fn speak_and_end(&self, text: &str) -> String {
        let mut body = String::new();
        say(&mut body, text);
        say(&mut body, CLOSING_LINE);
        body.push_str("<Hangup/>");
        document(&body)
    }

    /// A document that only speaks `text` (outbound calls).
    pub fn say_only(&self, text: &str) -> String {
        let mut body = String::new();
        say(&mut body, text);
        document(&body)
    }

    fn gather(&self, text: &str) -> String {
        let mut out = String::new();
        let _ = write!(
            out,
            r#"<Gather input="speech" action="{PROCESS_PATH}" method="POST" speechTimeout="{}" language="{}">"#,
            escape(&self.speech_timeout),
            escape(&self.language),
        );
        say(&mut out, text);
        out.push_str("</Gather>");
        out
    }
}

impl Default for TwimlBuilder {
    fn default() -> Self {
        Self::new("auto", "en-US")
    }
}

fn document(body: &str) -> String {
    format!("{XML_DECL}<Response>{body}</Response>")
}

fn say(out: &mut String, text: &str) {
    let _ = write!(out, "<Say>{}</Say>", escape(text));
}

/// Escapes the five XML special characters.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}
