// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory [`CustomerStore`] for development and tests.
//!
//! Ids are sequential per record type (`cust_1`, `note_1`, `appt_1`) and
//! never reused. Unknown ids yield [`ParleyError::NotFound`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parley_core::types::{
    Appointment, AppointmentDraft, AppointmentStatus, AppointmentUpdate, Customer, CustomerDraft,
    CustomerUpdate, Note,
};
use parley_core::{CustomerStore, ParleyError, mask_phone_number};
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Default)]
struct State {
    customers: BTreeMap<String, Customer>,
    notes: BTreeMap<String, Vec<Note>>,
    appointments: BTreeMap<String, Appointment>,
    next_customer: u64,
    next_note: u64,
    next_appointment: u64,
}

impl State {
    fn require_customer(&self, customer_id: &str) -> Result<(), ParleyError> {
        if self.customers.contains_key(customer_id) {
            Ok(())
        } else {
            Err(not_found("customer", customer_id))
        }
    }
}

fn not_found(kind: &str, id: &str) -> ParleyError {
    ParleyError::NotFound {
        kind: kind.to_string(),
        id: id.to_string(),
    }
}

fn next_id(counter: &mut u64, prefix: &str) -> String {
    *counter += 1;
    format!("{prefix}_{counter}")
}

/// Customer store held entirely in process memory.
#[derive(Default)]
pub struct InMemoryCrm {
    state: RwLock<State>,
}

impl InMemoryCrm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notes for `customer_id`, oldest first.
    pub async fn notes(&self, customer_id: &str) -> Vec<Note> {
        self.state
            .read()
            .await
            .notes
            .get(customer_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn customer_count(&self) -> usize {
        self.state.read().await.customers.len()
    }
}

#[async_trait]
impl CustomerStore for InMemoryCrm {
    async fn get_customer(&self, phone: &str) -> Result<Option<Customer>, ParleyError> {
        let state = self.state.read().await;
        let found = state.customers.values().find(|c| c.phone == phone).cloned();
        match &found {
            Some(customer) => debug!(customer_id = %customer.id, "customer found"),
            None => debug!(phone = %mask_phone_number(phone), "no customer for phone"),
        }
        Ok(found)
    }

    async fn create_customer(&self, draft: CustomerDraft) -> Result<Customer, ParleyError> {
        let mut state = self.state.write().await;
        let id = next_id(&mut state.next_customer, "cust");
        let customer = Customer {
            id: id.clone(),
            name: draft.name,
            phone: draft.phone,
            email: draft.email,
        };
        state.customers.insert(id.clone(), customer.clone());
        state.notes.insert(id.clone(), Vec::new());
        info!(customer_id = %id, "customer created");
        Ok(customer)
    }

    async fn update_customer(
        &self,
        customer_id: &str,
        update: CustomerUpdate,
    ) -> Result<Customer, ParleyError> {
        let mut state = self.state.write().await;
        let customer = state
            .customers
            .get_mut(customer_id)
            .ok_or_else(|| not_found("customer", customer_id))?;
        if let Some(name) = update.name {
            customer.name = name;
        }
        if let Some(phone) = update.phone {
            customer.phone = phone;
        }
        if let Some(email) = update.email {
            customer.email = Some(email);
        }
        info!(customer_id, "customer updated");
        Ok(customer.clone())
    }

    async fn create_note(&self, customer_id: &str, content: &str) -> Result<Note, ParleyError> {
        let mut state = self.state.write().await;
        state.require_customer(customer_id)?;
        let note = Note {
            id: next_id(&mut state.next_note, "note"),
            customer_id: customer_id.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        };
        state
            .notes
            .entry(customer_id.to_string())
            .or_default()
            .push(note.clone());
        info!(note_id = %note.id, customer_id, "note created");
        Ok(note)
    }

    async fn get_appointments(
        &self,
        customer_id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Appointment>, ParleyError> {
        let state = self.state.read().await;
        let mut appointments: Vec<Appointment> = state
            .appointments
            .values()
            .filter(|a| a.customer_id == customer_id)
            .filter(|a| start.is_none_or(|s| a.scheduled_time >= s))
            .filter(|a| end.is_none_or(|e| a.scheduled_time <= e))
            .cloned()
            .collect();
        appointments.sort_by_key(|a| a.scheduled_time);
        debug!(customer_id, count = appointments.len(), "appointments listed");
        Ok(appointments)
    }

    async fn create_appointment(
        &self,
        draft: AppointmentDraft,
    ) -> Result<Appointment, ParleyError> {
        let mut state = self.state.write().await;
        state.require_customer(&draft.customer_id)?;
        let appointment = Appointment {
            id: next_id(&mut state.next_appointment, "appt"),
            customer_id: draft.customer_id,
            scheduled_time: draft.scheduled_time,
            description: draft.description,
            status: AppointmentStatus::Scheduled,
            created_at: Utc::now(),
            cancelled_at: None,
        };
        state
            .appointments
            .insert(appointment.id.clone(), appointment.clone());
        info!(appointment_id = %appointment.id, "appointment created");
        Ok(appointment)
    }

    async fn update_appointment(
        &self,
        appointment_id: &str,
        update: AppointmentUpdate,
    ) -> Result<Appointment, ParleyError> {
        let mut state = self.state.write().await;
        let appointment = state
            .appointments
            .get_mut(appointment_id)
            .ok_or_else(|| not_found("appointment", appointment_id))?;
        if let Some(time) = update.scheduled_time {
            appointment.scheduled_time = time;
        }
        if let Some(description) = update.description {
            appointment.description = Some(description);
        }
        info!(appointment_id, "appointment updated");
        Ok(appointment.clone())
    }

    async fn cancel_appointment(&self, appointment_id: &str) -> Result<Appointment, ParleyError> {
        let mut state = self.state.write().await;
        let appointment = state
            .appointments
            .get_mut(appointment_id)
            .ok_or_else(|| not_found("appointment", appointment_id))?;
        appointment.status = AppointmentStatus::Cancelled;
        appointment.cancelled_at = Some(Utc::now());
        info!(appointment_id, "appointment cancelled");
        Ok(appointment.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ada() -> CustomerDraft {
        CustomerDraft {
            name: "Ada Lovelace".into(),
            phone: "+15551230000".into(),
            email: Some("ada@example.com".into()),
        }
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, 9, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn create_and_lookup_by_phone() {
        let crm = InMemoryCrm::new();
        let created = crm.create_customer(ada()).await.unwrap();
        assert_eq!(created.id, "cust_1");

        let found = crm.get_customer("+15551230000").await.unwrap().unwrap();
        assert_eq!(found, created);
        assert!(crm.get_customer("+15559999999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ids_are_sequential_per_kind() {
        let crm = InMemoryCrm::new();
        let a = crm.create_customer(ada()).await.unwrap();
        let b = crm
            .create_customer(CustomerDraft {
                name: "Grace".into(),
                phone: "+15551230001".into(),
                email: None,
            })
            .await
            .unwrap();
        let note = crm.create_note(&b.id, "first").await.unwrap();
        assert_eq!((a.id.as_str(), b.id.as_str(), note.id.as_str()), ("cust_1", "cust_2", "note_1"));
    }

    #[tokio::test]
    async fn update_customer_is_partial() {
        let crm = InMemoryCrm::new();
        let c = crm.create_customer(ada()).await.unwrap();
        let updated = crm
            .update_customer(
                &c.id,
                CustomerUpdate {
                    name: Some("Ada King".into()),
                    ..CustomerUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Ada King");
        assert_eq!(updated.email.as_deref(), Some("ada@example.com"));
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let crm = InMemoryCrm::new();
        let err = crm.create_note("cust_404", "hello").await.unwrap_err();
        assert!(matches!(err, ParleyError::NotFound { ref kind, .. } if kind == "customer"));

        let err = crm.cancel_appointment("appt_9").await.unwrap_err();
        assert_eq!(err.to_string(), "appointment not found: appt_9");

        let err = crm
            .update_customer("cust_404", CustomerUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ParleyError::NotFound { .. }));
    }

    #[tokio::test]
    async fn notes_accumulate_in_order() {
        let crm = InMemoryCrm::new();
        let c = crm.create_customer(ada()).await.unwrap();
        crm.create_note(&c.id, "one").await.unwrap();
        crm.create_note(&c.id, "two").await.unwrap();
        let contents: Vec<_> = crm.notes(&c.id).await.into_iter().map(|n| n.content).collect();
        assert_eq!(contents, ["one", "two"]);
    }

    #[tokio::test]
    async fn appointment_lifecycle_and_range_filter() {
        let crm = InMemoryCrm::new();
        let c = crm.create_customer(ada()).await.unwrap();
        for day in [10, 3, 20] {
            crm.create_appointment(AppointmentDraft {
                customer_id: c.id.clone(),
                scheduled_time: at(day),
                description: Some(format!("visit {day}")),
            })
            .await
            .unwrap();
        }

        let all = crm.get_appointments(&c.id, None, None).await.unwrap();
        let days: Vec<_> = all.iter().map(|a| a.scheduled_time).collect();
        assert_eq!(days, [at(3), at(10), at(20)]);

        // Bounds are inclusive.
        let window = crm
            .get_appointments(&c.id, Some(at(3)), Some(at(10)))
            .await
            .unwrap();
        assert_eq!(window.len(), 2);

        let moved = crm
            .update_appointment(
                "appt_1",
                AppointmentUpdate {
                    scheduled_time: Some(at(11)),
                    description: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.scheduled_time, at(11));
        assert_eq!(moved.description.as_deref(), Some("visit 10"));

        let cancelled = crm.cancel_appointment("appt_1").await.unwrap();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
        assert!(cancelled.cancelled_at.is_some());
    }

    #[tokio::test]
    async fn appointments_require_a_known_customer() {
        let crm = InMemoryCrm::new();
        let err = crm
            .create_appointment(AppointmentDraft {
                customer_id: "cust_1".into(),
                scheduled_time: at(1),
                description: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ParleyError::NotFound { .. }));
    }
}
