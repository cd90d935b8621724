// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Parley integration tests.
//!
//! Provides mock adapters for fast, deterministic, CI-runnable tests without
//! external services.
//!
//! # Components
//!
//! - [`MockBackend`] - Scripted AI backend with switchable health
//! - [`MockTelephony`] - Telephony provider that captures outbound traffic

pub mod mock_backend;
pub mod mock_telephony;

pub use mock_backend::{MockBackend, MockHealth, MockReply};
pub use mock_telephony::{MockTelephony, PlacedCall, SentMessage};
