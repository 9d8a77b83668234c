// SPDX-FileCopyrightText: 2026 Kash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapter trait for chat transports.

use async_trait::async_trait;

use crate::error::KashError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChannelCapabilities, InboundMessage, MessageId, OutboundMessage};

/// Adapter for a bidirectional chat transport.
///
/// `send` must deliver exactly what it is given: formatting fallbacks are
/// the caller's decision, so a rejected rich message is reported as an error.
#[async_trait]
pub trait ChannelAdapter: PluginAdapter {
    /// Returns the capabilities supported by this channel.
    fn capabilities(&self) -> ChannelCapabilities;

    /// Establishes a connection to the messaging platform.
    async fn connect(&mut self) -> Result<(), KashError>;

    /// Sends a message through the channel.
    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, KashError>;

    /// Deletes a previously sent or received message.
    async fn delete_message(&self, chat_id: &str, message_id: &MessageId)
        -> Result<(), KashError>;

    /// Receives the next inbound message from the channel.
    async fn receive(&self) -> Result<InboundMessage, KashError>;
}
