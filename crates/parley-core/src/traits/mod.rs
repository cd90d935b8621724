// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator trait definitions.
//!
//! All traits use `#[async_trait]` so the router and the assistant can hold
//! implementations as `Arc<dyn Trait>`.

pub mod backend;
pub mod crm;
pub mod telephony;

pub use backend::{BackendAdapter, run_turn};
pub use crm::CustomerStore;
pub use telephony::Telephony;
