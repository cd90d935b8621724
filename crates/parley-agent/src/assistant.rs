// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The phone assistant: call lifecycle, CRM logging, and SMS replies.

use std::sync::Arc;
use std::time::Duration;

use parley_config::ParleyConfig;
use parley_core::traits::backend::BLANK_INPUT_REPLY;
use parley_core::types::Customer;
use parley_core::{
    ConversationId, CustomerStore, ParleyError, Telephony, mask_phone_number, preview,
};
use parley_router::{Availability, Router, UsageReport};
use tracing::{debug, error, info, warn};

use crate::calls::{CallRegistry, CallSnapshot};
use crate::prompt::{PromptBuilder, SMS_PROMPT, is_ending_phrase};

/// Greeting for callers the CRM does not know.
pub const GENERIC_GREETING: &str =
    "Hello! Thank you for calling. I'm your AI assistant. How can I help you today?";

/// What one idle sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdleSweep {
    pub transcripts: usize,
    pub calls: usize,
}

/// Orchestrates router, customer store, and telephony for every caller.
pub struct PhoneAssistant {
    router: Arc<Router>,
    crm: Arc<dyn CustomerStore>,
    telephony: Arc<dyn Telephony>,
    prompts: PromptBuilder,
    calls: CallRegistry,
}

impl PhoneAssistant {
    pub fn new(
        router: Arc<Router>,
        crm: Arc<dyn CustomerStore>,
        telephony: Arc<dyn Telephony>,
        prompts: PromptBuilder,
    ) -> Self {
        Self {
            router,
            crm,
            telephony,
            prompts,
            calls: CallRegistry::new(),
        }
    }

    pub fn from_config(
        config: &ParleyConfig,
        router: Arc<Router>,
        crm: Arc<dyn CustomerStore>,
        telephony: Arc<dyn Telephony>,
    ) -> Self {
        Self::new(router, crm, telephony, PromptBuilder::from_config(&config.agent))
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn telephony(&self) -> &Arc<dyn Telephony> {
        &self.telephony
    }

    /// Answers a call: greets known customers by name and starts a fresh
    /// conversation.
    pub async fn incoming_call(&self, caller: &str) -> String {
        let customer = self.lookup(caller).await;
        let greeting = match &customer {
            Some(customer) => {
                info!(customer_id = %customer.id, "recognized customer");
                format!(
                    "Hello {}! Thank you for calling. How can I help you today?",
                    customer.name
                )
            }
            None => {
                info!(caller = %mask_phone_number(caller), "new caller");
                GENERIC_GREETING.to_string()
            }
        };

        self.router.reset_conversations(&ConversationId::voice(caller));
        self.calls.start(caller, customer);
        metrics::counter!("parley_calls_total").increment(1);

        self.telephony.greeting(&greeting)
    }

    /// Handles one transcribed utterance and returns the markup to speak.
    pub async fn process_utterance(&self, caller: &str, text: &str) -> String {
        if text.trim().is_empty() {
            return self.telephony.speak_and_continue(BLANK_INPUT_REPLY);
        }

        let call = self.calls.get(caller);
        let _turn = match &call {
            Some(call) => Some(call.lock_turn().await),
            None => None,
        };
        let customer = call.as_ref().and_then(|c| c.customer.clone());
        if let Some(call) = &call {
            let n = call.record_interaction();
            debug!(caller = %mask_phone_number(caller), interaction = n, "processing utterance");
        }

        let system_prompt = self.prompts.voice_prompt(customer.as_ref());
        let conversation = ConversationId::voice(caller);
        let (reply, decision) = self
            .router
            .generate_response(&conversation, text, Some(&system_prompt))
            .await;
        info!(
            caller = %mask_phone_number(caller),
            backend = %decision.backend,
            utterance = %preview(text, 50),
            "utterance answered"
        );

        if let Some(customer) = &customer {
            let note = format!("Call interaction - User: {text} | Assistant: {reply}");
            self.append_note(customer, &note).await;
        }

        if is_ending_phrase(&reply) {
            self.telephony.speak_and_end(&reply)
        } else {
            self.telephony.speak_and_continue(&reply)
        }
    }

    /// Winds down a finished call: logs a summary for known customers and
    /// clears the conversation. Unknown callers are ignored.
    pub async fn call_ended(&self, caller: &str) {
        let Some(call) = self.calls.get(caller) else {
            debug!(caller = %mask_phone_number(caller), "no active call");
            return;
        };
        // Let an in-flight utterance finish first.
        let _turn = call.lock_turn().await;
        let conversation = ConversationId::voice(caller);

        if let Some(customer) = &call.customer {
            let summary = self.router.get_conversation_summary(&conversation).await;
            let note = format!(
                "Call Summary (Duration: {}s): {summary}",
                call.duration_secs()
            );
            self.append_note(customer, &note).await;
        }

        self.router.reset_conversations(&conversation);
        self.calls.finish(caller, &call);
        info!(
            caller = %mask_phone_number(caller),
            interactions = call.interactions(),
            "call ended"
        );
    }

    /// Answers an SMS and texts the reply back to `sender`.
    ///
    /// SMS threads keep their own conversation, separate from voice calls.
    pub async fn incoming_message(&self, sender: &str, body: &str) -> Result<String, ParleyError> {
        info!(
            sender = %mask_phone_number(sender),
            body = %preview(body, 30),
            "incoming SMS"
        );
        let conversation = ConversationId::sms(sender);
        let (reply, decision) = self
            .router
            .generate_response(&conversation, body, Some(SMS_PROMPT))
            .await;
        debug!(backend = %decision.backend, "SMS reply generated");

        let sid = self.telephony.send_message(sender, &reply).await?;
        info!(sender = %mask_phone_number(sender), sid = %sid, "SMS reply sent");
        Ok(reply)
    }

    /// Places an outbound call that speaks `message`.
    pub async fn outbound_call(
        &self,
        to: &str,
        message: &str,
        status_callback: Option<&str>,
    ) -> Result<String, ParleyError> {
        let sid = self
            .telephony
            .make_call(to, message, status_callback)
            .await
            .inspect_err(|e| error!(to = %mask_phone_number(to), error = %e, "outbound call failed"))?;
        info!(to = %mask_phone_number(to), sid = %sid, "outbound call initiated");
        Ok(sid)
    }

    /// Sends a one-off SMS notification.
    pub async fn send_notification(&self, to: &str, message: &str) -> Result<String, ParleyError> {
        self.telephony
            .send_message(to, message)
            .await
            .inspect_err(|e| error!(to = %mask_phone_number(to), error = %e, "SMS notification failed"))
    }

    /// Drops transcripts and active calls untouched for `max_idle`.
    ///
    /// Expired calls are removed silently; no summary note is written.
    pub fn expire_idle(&self, max_idle: Duration) -> IdleSweep {
        let sweep = IdleSweep {
            transcripts: self.router.expire_idle_conversations(max_idle),
            calls: self.calls.expire_idle(max_idle),
        };
        if sweep != IdleSweep::default() {
            info!(
                transcripts = sweep.transcripts,
                calls = sweep.calls,
                "expired idle conversations"
            );
        }
        sweep
    }

    pub fn active_call_count(&self) -> usize {
        self.calls.len()
    }

    pub fn active_call(&self, caller: &str) -> Option<CallSnapshot> {
        self.calls.get(caller).map(|call| call.snapshot())
    }

    pub fn usage_report(&self) -> UsageReport {
        self.router.usage().report()
    }

    pub async fn availability(&self) -> Availability {
        self.router.availability().await
    }

    async fn lookup(&self, caller: &str) -> Option<Customer> {
        match self.crm.get_customer(caller).await {
            Ok(customer) => customer,
            Err(e) => {
                warn!(caller = %mask_phone_number(caller), error = %e, "customer lookup failed");
                None
            }
        }
    }

    async fn append_note(&self, customer: &Customer, note: &str) {
        if let Err(e) = self.crm.create_note(&customer.id, note).await {
            error!(customer_id = %customer.id, error = %e, "failed to log to CRM");
        }
    }
}
