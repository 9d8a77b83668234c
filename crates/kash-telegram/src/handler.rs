// SPDX-FileCopyrightText: 2026 Kash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound message mapping.
//!
//! Turns a Telegram text message into a channel-agnostic
//! [`InboundMessage`], recognising `/start` and the clear-context button.

use kash_core::types::{InboundKind, InboundMessage, MessageId};
use kash_core::UserId;
use teloxide::types::Message;

/// Classifies message text.
///
/// `/start` (optionally addressed as `/start@bot` or with a payload) starts a
/// session; text equal to the button label clears the context; anything
/// else is relayed.
pub fn classify(text: &str, clear_button: &str) -> InboundKind {
    let trimmed = text.trim();
    let command = trimmed.split_whitespace().next().unwrap_or_default();
    if command == "/start" || command.starts_with("/start@") {
        InboundKind::Start
    } else if trimmed == clear_button.trim() {
        InboundKind::ClearContext
    } else {
        InboundKind::Text(text.to_string())
    }
}

/// Maps a Telegram message to an [`InboundMessage`].
///
/// Returns `None` for messages without text (stickers, photos, locations).
/// The history owner is the sender; without one, the chat.
pub fn to_inbound_message(msg: &Message, clear_button: &str) -> Option<InboundMessage> {
    let text = msg.text()?;

    let (user_id, username) = match msg.from.as_ref() {
        Some(user) => (user.id.0.to_string(), user.username.clone()),
        None => (msg.chat.id.0.to_string(), None),
    };

    Some(InboundMessage {
        id: MessageId(msg.id.0.to_string()),
        user_id: UserId(user_id),
        chat_id: msg.chat.id.0.to_string(),
        username,
        kind: classify(text, clear_button),
        timestamp: msg.date.to_rfc3339(),
    })
}
