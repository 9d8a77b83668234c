// SPDX-FileCopyrightText: 2026 Kash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use std::time::Duration;

use kash_core::types::ParseMode;
use serde::{Deserialize, Serialize};

/// Top-level Kash configuration.
///
/// Every section is optional and falls back to the defaults below.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KashConfig {
    /// Bot identity.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Telegram transport settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Completion backend settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Conversation history settings.
    #[serde(default)]
    pub history: HistoryConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// User-visible texts.
    #[serde(default)]
    pub messages: MessagesConfig,
}

/// Bot identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name, substituted for `{name}` in the greeting.
    #[serde(default = "default_agent_name")]
    pub name: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
        }
    }
}

fn default_agent_name() -> String {
    "kash".to_string()
}

/// Telegram transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. Required by `serve`.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Replies at or above this many characters are split and sent plain.
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,

    /// Formatting used for the first, rich delivery attempt.
    #[serde(default)]
    pub parse_mode: ParseMode,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            max_message_length: default_max_message_length(),
            parse_mode: ParseMode::default(),
        }
    }
}

fn default_max_message_length() -> usize {
    3000
}

/// Completion backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Backend host, with or without scheme (`localhost:18888`).
    #[serde(default = "default_host")]
    pub host: String,

    /// Model name sent in every request.
    #[serde(default)]
    pub name: String,

    /// Timeout for the whole completion call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Per-message `condition` hint understood by OpenChat-style servers.
    #[serde(default)]
    pub message_condition: Option<String>,
}

impl ModelConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            name: String::new(),
            timeout_secs: default_timeout_secs(),
            message_condition: None,
        }
    }
}

fn default_host() -> String {
    "localhost:18888".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

/// Conversation history configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HistoryConfig {
    /// Directory holding one `history_{user_id}.json` per user.
    #[serde(default = "default_history_path")]
    pub path: String,

    /// Number of most recent records considered for the context window.
    #[serde(default = "default_context_window")]
    pub context_window: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: default_history_path(),
            context_window: default_context_window(),
        }
    }
}

fn default_history_path() -> String {
    "temp/history_messages".to_string()
}

fn default_context_window() -> usize {
    10
}

/// Log output configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Directory for daily log files. Logs go to stderr when unset.
    #[serde(default)]
    pub dir: Option<String>,

    /// Log at info level instead of errors only.
    #[serde(default)]
    pub debug: bool,
}

/// User-visible texts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MessagesConfig {
    /// Greeting sent on `/start`; `{name}` is replaced by `agent.name`.
    #[serde(default = "default_ready")]
    pub ready: String,

    /// Sent while the model is answering, deleted afterwards.
    #[serde(default = "default_pending")]
    pub pending: String,

    /// Sent when a request for the same user is already in flight.
    #[serde(default = "default_busy")]
    pub busy: String,

    /// Sent when the backend answers with an error status.
    #[serde(default = "default_model_error")]
    pub model_error: String,

    /// Sent on storage and transport faults.
    #[serde(default = "default_internal_error")]
    pub internal_error: String,

    /// Sent when the reply could not be delivered even as plain text.
    #[serde(default = "default_delivery_error")]
    pub delivery_error: String,

    /// Confirmation after the context was cleared.
    #[serde(default = "default_context_cleared")]
    pub context_cleared: String,

    /// Label of the reply-keyboard button that clears the context.
    #[serde(default = "default_clear_button")]
    pub clear_button: String,
}

impl MessagesConfig {
    /// The greeting with the agent name substituted.
    pub fn ready_for(&self, name: &str) -> String {
        self.ready.replace("{name}", name)
    }
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            ready: default_ready(),
            pending: default_pending(),
            busy: default_busy(),
            model_error: default_model_error(),
            internal_error: default_internal_error(),
            delivery_error: default_delivery_error(),
            context_cleared: default_context_cleared(),
            clear_button: default_clear_button(),
        }
    }
}

fn default_ready() -> String {
    "{name} is ready".to_string()
}

fn default_pending() -> String {
    "Answering...".to_string()
}

fn default_busy() -> String {
    "You already have a request in progress. Try again later.".to_string()
}

fn default_model_error() -> String {
    "The model did not answer or answered with an error. Try again later.".to_string()
}

fn default_internal_error() -> String {
    "An internal error occurred. Try again later.".to_string()
}

fn default_delivery_error() -> String {
    "Error in the reply. Try again.".to_string()
}

fn default_context_cleared() -> String {
    "Context cleared".to_string()
}

fn default_clear_button() -> String {
    "Clear context".to_string()
}
