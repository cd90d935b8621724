// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Customer store trait for CRM integrations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ParleyError;
use crate::types::{
    Appointment, AppointmentDraft, AppointmentUpdate, Customer, CustomerDraft, CustomerUpdate,
    Note,
};

/// Customer-relationship store: a phone-keyed customer lookup, an append-only
/// note log, and appointment bookkeeping.
#[async_trait]
pub trait CustomerStore: Send + Sync + 'static {
    /// Looks up a customer by phone number. `Ok(None)` when unknown.
    async fn get_customer(&self, phone: &str) -> Result<Option<Customer>, ParleyError>;

    async fn create_customer(&self, draft: CustomerDraft) -> Result<Customer, ParleyError>;

    async fn update_customer(
        &self,
        customer_id: &str,
        update: CustomerUpdate,
    ) -> Result<Customer, ParleyError>;

    /// Appends a note to a customer record.
    async fn create_note(&self, customer_id: &str, content: &str) -> Result<Note, ParleyError>;

    /// Lists a customer's appointments, optionally bounded by scheduled time
    /// (both bounds inclusive).
    async fn get_appointments(
        &self,
        customer_id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Appointment>, ParleyError>;

    async fn create_appointment(
        &self,
        draft: AppointmentDraft,
    ) -> Result<Appointment, ParleyError>;

    async fn update_appointment(
        &self,
        appointment_id: &str,
        update: AppointmentUpdate,
    ) -> Result<Appointment, ParleyError>;

    async fn cancel_appointment(&self, appointment_id: &str) -> Result<Appointment, ParleyError>;
}
