// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Parley phone assistant.

use thiserror::Error;

/// The primary error type used across all Parley collaborator traits.
///
/// None of these ever reach a caller on the phone: the router and the
/// assistant convert them into natural-language replies at their boundary.
#[derive(Debug, Error)]
pub enum ParleyError {
    /// Configuration errors (missing credentials, malformed values).
    #[error("configuration error: {0}")]
    Config(String),

    /// AI backend errors (connection failure, rate limiting, malformed response).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Telephony provider errors (REST failure, rejected message).
    #[error("telephony error: {message}")]
    Telephony {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Customer store errors.
    #[error("crm error: {0}")]
    Crm(String),

    /// A customer, appointment, or other record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ParleyError {
    /// Wraps a transport or decoding error as a provider error with context.
    pub fn from_http(err: impl Into<Box<dyn std::error::Error + Send + Sync>>, context: &str) -> Self {
        let err = err.into();
        ParleyError::Provider {
            message: format!("{context}: {err}"),
            source: Some(err),
        }
    }

    /// Returns true for failures worth retrying on another backend.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ParleyError::Provider { .. } | ParleyError::Timeout { .. }
        )
    }
}
