// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Twilio integration for the Parley phone assistant.
//!
//! - [`TwimlBuilder`] renders the voice responses returned from webhooks
//! - [`TwilioClient`] sends SMS and places calls over the REST API
//! - [`validate_signature`] authenticates inbound webhooks
//!
//! [`TwilioTelephony`] ties the first two together behind the
//! [`Telephony`] trait the assistant depends on.

pub mod client;
pub mod signature;
pub mod twiml;

use std::time::Duration;

use async_trait::async_trait;
use parley_config::ParleyConfig;
use parley_core::{ParleyError, Telephony};

pub use client::{CallStatus, TwilioClient};
pub use signature::{SIGNATURE_HEADER, compute_signature, validate_signature};
pub use twiml::TwimlBuilder;

/// Twilio-backed [`Telephony`] provider.
pub struct TwilioTelephony {
    twiml: TwimlBuilder,
    client: TwilioClient,
}

impl TwilioTelephony {
    pub fn new(twiml: TwimlBuilder, client: TwilioClient) -> Self {
        Self { twiml, client }
    }

    /// Builds the provider from `[twilio]`.
    ///
    /// Fails with [`ParleyError::Config`] when the account SID, auth token,
    /// or phone number is missing.
    pub fn from_config(config: &ParleyConfig) -> Result<Self, ParleyError> {
        let twilio = &config.twilio;
        let required = |value: &Option<String>, key: &str| {
            value
                .clone()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ParleyError::Config(format!("twilio.{key} is required")))
        };
        let account_sid = required(&twilio.account_sid, "account_sid")?;
        let auth_token = required(&twilio.auth_token, "auth_token")?;
        let phone_number = required(&twilio.phone_number, "phone_number")?;

        let client = TwilioClient::new(
            account_sid,
            auth_token,
            phone_number,
            Duration::from_secs(config.routing.request_timeout_secs),
        )?;
        let twiml = TwimlBuilder::new(&twilio.speech_timeout, &twilio.voice_language);
        Ok(Self::new(twiml, client))
    }

    pub fn client(&self) -> &TwilioClient {
        &self.client
    }

    pub fn twiml(&self) -> &TwimlBuilder {
        &self.twiml
    }
}

#[async_trait]
impl Telephony for TwilioTelephony {
    fn greeting(&self, text: &str) -> String {
        self.twiml.greeting(text)
    }

    fn speak_and_continue(&self, text: &str) -> String {
        self.twiml.speak_and_continue(text)
    }

    fn speak_and_end(&self, text: &str) -> String {
        self.twiml.speak_and_end(text)
    }

    async fn send_message(&self, to: &str, body: &str) -> Result<String, ParleyError> {
        self.client.send_message(to, body).await
    }

    async fn make_call(
        &self,
        to: &str,
        message: &str,
        status_callback: Option<&str>,
    ) -> Result<String, ParleyError> {
        let twiml = self.twiml.say_only(message);
        self.client.make_call(to, &twiml, status_callback).await
    }
}
