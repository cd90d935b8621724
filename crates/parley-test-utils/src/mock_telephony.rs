// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock telephony provider that captures outbound traffic.
//!
//! Markup is rendered as tiny tagged strings (`<continue>text</continue>`)
//! so tests can assert on intent without parsing TwiML.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use parley_core::{ParleyError, Telephony};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub to: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedCall {
    pub to: String,
    pub message: String,
    pub status_callback: Option<String>,
}

/// A telephony provider for testing.
///
/// Outbound SMS and calls are recorded and get ids `SM1`, `SM2`, ... and
/// `CA1`, `CA2`, ...
#[derive(Default)]
pub struct MockTelephony {
    sent: Mutex<Vec<SentMessage>>,
    calls: Mutex<Vec<PlacedCall>>,
    next_id: AtomicU64,
    fail_outbound: AtomicBool,
}

impl MockTelephony {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `send_message` and `make_call` fail from now on.
    pub fn fail_outbound(&self) {
        self.fail_outbound.store(true, Ordering::SeqCst);
    }

    pub async fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn placed_calls(&self) -> Vec<PlacedCall> {
        self.calls.lock().await.clone()
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{prefix}{n}")
    }

    fn check_outbound(&self) -> Result<(), ParleyError> {
        if self.fail_outbound.load(Ordering::SeqCst) {
            return Err(ParleyError::Telephony {
                message: "scripted telephony outage".into(),
                source: None,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Telephony for MockTelephony {
    fn greeting(&self, text: &str) -> String {
        format!("<greeting>{text}</greeting>")
    }

    fn speak_and_continue(&self, text: &str) -> String {
        format!("<continue>{text}</continue>")
    }

    fn speak_and_end(&self, text: &str) -> String {
        format!("<end>{text}</end>")
    }

    async fn send_message(&self, to: &str, body: &str) -> Result<String, ParleyError> {
        self.check_outbound()?;
        self.sent.lock().await.push(SentMessage {
            to: to.to_string(),
            body: body.to_string(),
        });
        Ok(self.next_id("SM"))
    }

    async fn make_call(
        &self,
        to: &str,
        message: &str,
        status_callback: Option<&str>,
    ) -> Result<String, ParleyError> {
        self.check_outbound()?;
        self.calls.lock().await.push(PlacedCall {
            to: to.to_string(),
            message: message.to_string(),
            status_callback: status_callback.map(str::to_string),
        });
        Ok(self.next_id("CA"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_messages_and_calls() {
        let telephony = MockTelephony::new();
        let sid = telephony.send_message("+15550001111", "hi").await.unwrap();
        let call = telephony
            .make_call("+15550002222", "reminder", None)
            .await
            .unwrap();

        assert_eq!(sid, "SM1");
        assert_eq!(call, "CA2");
        assert_eq!(telephony.sent_messages().await[0].body, "hi");
        assert_eq!(telephony.placed_calls().await[0].message, "reminder");
    }

    #[tokio::test]
    async fn scripted_outage() {
        let telephony = MockTelephony::new();
        telephony.fail_outbound();
        assert!(telephony.send_message("+15550001111", "hi").await.is_err());
        assert!(telephony.sent_messages().await.is_empty());
    }
}
