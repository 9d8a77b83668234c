// SPDX-FileCopyrightText: 2026 Kash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Two-attempt reply delivery.
//!
//! Attempt 1 sends a short reply as one message in the configured parse
//! mode. Attempt 2 runs when the reply is too long or attempt 1 was
//! rejected: the reply is split on line boundaries and sent as plain text,
//! chunk by chunk. There is no third attempt.

use kash_core::types::{OutboundMessage, ParseMode};
use kash_core::{ChannelAdapter, KashError};
use tracing::{debug, warn};

use crate::splitter::split;

/// Line separator used when splitting replies.
pub const LINE_SEPARATOR: &str = "\n";

/// How replies are sent on a channel.
#[derive(Debug, Clone, Copy)]
pub struct DeliveryOptions {
    /// Chunk size limit in chars.
    pub max_len: usize,
    /// Parse mode of the single-message attempt.
    pub parse_mode: ParseMode,
    /// Attach the clear-context keyboard to every message.
    pub keyboard: bool,
}

/// What a successful delivery did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivered {
    /// Messages sent to the channel.
    pub messages: usize,
    /// Whether the plain split attempt was used.
    pub split: bool,
}

fn outbound(chat_id: &str, content: &str, mode: ParseMode, opts: &DeliveryOptions) -> OutboundMessage {
    let msg = OutboundMessage::plain(chat_id, content).with_parse_mode(mode);
    if opts.keyboard { msg.with_keyboard() } else { msg }
}

/// Sends `text` to `chat_id`, falling back to plain split chunks.
///
/// Errors only when the plain attempt fails; remaining chunks are then
/// abandoned and the error is a [`KashError::Delivery`] carrying the number
/// of chunks already sent. A blank reply fails without sending anything.
pub async fn deliver(
    channel: &dyn ChannelAdapter,
    chat_id: &str,
    text: &str,
    opts: &DeliveryOptions,
) -> Result<Delivered, KashError> {
    if text.trim().is_empty() {
        return Err(KashError::Delivery {
            message: "reply has no printable text".into(),
            delivered: 0,
            source: None,
        });
    }

    let len = text.chars().count();

    if len < opts.max_len {
        match channel
            .send(outbound(chat_id, text, opts.parse_mode, opts))
            .await
        {
            Ok(_) => {
                return Ok(Delivered {
                    messages: 1,
                    split: false,
                });
            }
            Err(e) => {
                warn!(
                    chat_id,
                    parse_mode = %opts.parse_mode,
                    error = %e,
                    "formatted send rejected, retrying as plain text"
                );
            }
        }
    } else {
        debug!(chat_id, len, max_len = opts.max_len, "reply exceeds limit, splitting");
    }

    let chunks = split(text, opts.max_len, LINE_SEPARATOR);
    let total = chunks.len();
    let mut sent = 0;
    for (i, chunk) in chunks.iter().enumerate() {
        if chunk.trim().is_empty() {
            continue;
        }
        channel
            .send(outbound(chat_id, chunk, ParseMode::Plain, opts))
            .await
            .map_err(|e| KashError::Delivery {
                message: format!("chunk {} of {total} rejected: {e}", i + 1),
                delivered: sent,
                source: Some(Box::new(e)),
            })?;
        sent += 1;
    }

    debug!(chat_id, chunks = sent, "reply delivered as plain text");
    Ok(Delivered {
        messages: sent,
        split: true,
    })
}
