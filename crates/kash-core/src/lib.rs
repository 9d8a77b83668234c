// SPDX-FileCopyrightText: 2026 Kash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Kash relay bot.
//!
//! Holds the adapter traits, the error type, and the types shared by the
//! history store, the completion client, the chat channel and the session
//! orchestrator.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{FaultKind, KashError};
pub use types::{AdapterType, HealthStatus, MessageId, UserId, FORGET_SENTINEL};

pub use traits::{ChannelAdapter, HistoryStore, PluginAdapter, ProviderAdapter};
