// SPDX-FileCopyrightText: 2026 Kash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Kash relay.

use std::fmt;
use std::time::Duration;

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Reserved record text marking a context-reset boundary in a history log.
pub const FORGET_SENTINEL: &str = "forget";

/// Stable identifier of a chat user. Partitions history and admission state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawUserId", into = "String")]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        UserId(value.to_string())
    }
}

impl From<i64> for UserId {
    fn from(value: i64) -> Self {
        UserId(value.to_string())
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

/// History files written by older deployments store numeric ids.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawUserId {
    Number(i64),
    Text(String),
}

impl From<RawUserId> for UserId {
    fn from(raw: RawUserId) -> Self {
        match raw {
            RawUserId::Number(n) => UserId(n.to_string()),
            RawUserId::Text(s) => UserId(s),
        }
    }
}

/// Unique identifier for a message on the channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Channel,
    Provider,
    Storage,
}

// --- History ---

/// One persisted conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Wall-clock local time, second precision.
    #[serde(with = "record_time")]
    pub time: NaiveDateTime,
    pub user_id: UserId,
    pub username: Option<String>,
    /// `true` when the text was produced by the model.
    pub is_bot: bool,
    pub text: String,
}

impl HistoryRecord {
    /// Creates a record stamped with the current local time.
    pub fn new(
        user_id: UserId,
        username: Option<String>,
        is_bot: bool,
        text: impl Into<String>,
    ) -> Self {
        let now = chrono::Local::now().naive_local();
        Self {
            time: now.with_nanosecond(0).unwrap_or(now),
            user_id,
            username,
            is_bot,
            text: text.into(),
        }
    }

    /// Creates a user-authored forget marker.
    pub fn forget(user_id: UserId, username: Option<String>) -> Self {
        Self::new(user_id, username, false, FORGET_SENTINEL)
    }

    /// Returns true if this record is a context-reset marker.
    pub fn is_forget_marker(&self) -> bool {
        self.text == FORGET_SENTINEL
    }

    /// Role of this record when replayed to the model.
    pub fn role(&self) -> Role {
        if self.is_bot {
            Role::Assistant
        } else {
            Role::User
        }
    }
}

mod record_time {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(time: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

// --- Completion ---

/// Speaker of a context entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A role-tagged entry of the context window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A single completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    /// Upper bound for the whole remote call.
    pub timeout: Duration,
}

/// The reply text of a successful completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionReply {
    pub content: String,
    /// Model name reported by the backend, if any.
    pub model: Option<String>,
}

// --- Channel ---

/// What the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundKind {
    /// Free text to relay to the model.
    Text(String),
    /// Session start: hard-clears the history log.
    Start,
    /// Clear-context button: writes a forget marker.
    ClearContext,
}

/// A channel-agnostic inbound message.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub id: MessageId,
    pub user_id: UserId,
    /// Where replies go.
    pub chat_id: String,
    pub username: Option<String>,
    pub kind: InboundKind,
    pub timestamp: String,
}

/// Formatting requested for an outbound message.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ParseMode {
    /// Legacy Telegram Markdown, passed through unescaped.
    #[default]
    Markdown,
    /// Telegram MarkdownV2, escaped by the channel.
    MarkdownV2,
    /// No markup.
    Plain,
}

/// An outbound message to be sent via a channel adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub chat_id: String,
    pub content: String,
    pub parse_mode: ParseMode,
    /// Attach the clear-context reply keyboard.
    pub keyboard: bool,
}

impl OutboundMessage {
    /// A plain-text message without keyboard.
    pub fn plain(chat_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            content: content.into(),
            parse_mode: ParseMode::Plain,
            keyboard: false,
        }
    }

    pub fn with_parse_mode(mut self, parse_mode: ParseMode) -> Self {
        self.parse_mode = parse_mode;
        self
    }

    pub fn with_keyboard(mut self) -> Self {
        self.keyboard = true;
        self
    }
}

/// Capabilities reported by a channel adapter.
#[derive(Debug, Clone)]
pub struct ChannelCapabilities {
    pub supports_delete: bool,
    pub supports_keyboard: bool,
    pub max_message_length: Option<usize>,
}
