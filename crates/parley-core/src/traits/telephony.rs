// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telephony provider trait: spoken-response markup and outbound messaging.

use async_trait::async_trait;

use crate::error::ParleyError;

/// The telephony provider as seen by the assistant.
///
/// Markup builders are synchronous and infallible; only the REST calls that
/// place messages or calls can fail.
#[async_trait]
pub trait Telephony: Send + Sync + 'static {
    /// Markup that greets the caller and listens for speech.
    fn greeting(&self, text: &str) -> String;

    /// Markup that speaks `text` and keeps listening.
    fn speak_and_continue(&self, text: &str) -> String;

    /// Markup that speaks `text` and hangs up.
    fn speak_and_end(&self, text: &str) -> String;

    /// Sends an SMS and returns the provider's message id.
    async fn send_message(&self, to: &str, body: &str) -> Result<String, ParleyError>;

    /// Places an outbound call that speaks `message`, returning the call id.
    async fn make_call(
        &self,
        to: &str,
        message: &str,
        status_callback: Option<&str>,
    ) -> Result<String, ParleyError>;
}
