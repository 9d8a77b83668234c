// SPDX-FileCopyrightText: 2026 Kash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Kash relay bot.

use strum::Display;
use thiserror::Error;

/// The primary error type used across all Kash adapter traits and core operations.
#[derive(Debug, Error)]
pub enum KashError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// History storage errors (I/O failure, malformed history file).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Channel adapter errors (connection failure, rejected send or delete).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The completion request could not be carried out (network failure,
    /// unexpected response body).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The completion backend answered with a non-success status code.
    #[error("model returned status {status}: {body}")]
    ModelStatus { status: u16, body: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// The user already has a request in flight.
    #[error("user {user_id} already has a request in flight")]
    AdmissionDenied { user_id: String },

    /// The live history window is empty, nothing to send to the model.
    #[error("context is empty for user {user_id}")]
    EmptyContext { user_id: String },

    /// The reply could not be delivered to the channel.
    #[error("delivery failed: {message}")]
    Delivery {
        message: String,
        /// Messages the user did receive before the failure.
        delivered: usize,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl KashError {
    /// Wraps any error as a storage fault.
    pub fn storage(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        KashError::Storage {
            source: source.into(),
        }
    }

    /// Classifies the error into the user-facing fault taxonomy.
    pub fn fault_kind(&self) -> FaultKind {
        match self {
            KashError::AdmissionDenied { .. } => FaultKind::AdmissionDenied,
            KashError::Storage { .. } => FaultKind::Storage,
            KashError::ModelStatus { .. } => FaultKind::Model,
            KashError::EmptyContext { .. } => FaultKind::EmptyContext,
            KashError::Delivery { .. } => FaultKind::Delivery,
            KashError::Provider { .. }
            | KashError::Timeout { .. }
            | KashError::Channel { .. }
            | KashError::Config(_)
            | KashError::Internal(_) => FaultKind::Transport,
        }
    }
}

/// User-facing fault categories. Each maps to one notification text and
/// one log severity in the session orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum FaultKind {
    AdmissionDenied,
    Storage,
    Model,
    Transport,
    EmptyContext,
    Delivery,
}
