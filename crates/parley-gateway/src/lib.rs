// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Twilio webhook server for the Parley phone assistant.
//!
//! Exposes the voice and SMS webhooks plus health and usage endpoints,
//! optionally verifying `X-Twilio-Signature` on every webhook.

pub mod auth;
pub mod handlers;
pub mod server;

pub use auth::{SignatureConfig, signature_middleware};
pub use server::{
    GatewayState, HealthInfo, MetricsRender, build_router, shutdown_signal, start_server,
};
