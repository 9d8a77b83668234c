// SPDX-FileCopyrightText: 2026 Kash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel adapter for deterministic testing.
//!
//! `MockChannel` implements `ChannelAdapter` with injectable inbound messages,
//! captured outbound messages and deletions, and switchable send failures.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use kash_core::traits::adapter::PluginAdapter;
use kash_core::traits::channel::ChannelAdapter;
use kash_core::types::{
    AdapterType, ChannelCapabilities, HealthStatus, InboundKind, InboundMessage, MessageId,
    OutboundMessage, ParseMode,
};
use kash_core::{KashError, UserId};

/// A mock messaging channel for testing.
///
/// - **inbound**: messages injected via `inject_message()` are returned by `receive()`
/// - **sent**: messages passed to `send()` are captured and retrievable via `sent_messages()`
/// - **deleted**: `(chat_id, message_id)` pairs passed to `delete_message()`
pub struct MockChannel {
    inbound: Mutex<VecDeque<InboundMessage>>,
    sent: Mutex<Vec<OutboundMessage>>,
    deleted: Mutex<Vec<(String, MessageId)>>,
    notify: Notify,
    closed: AtomicBool,
    next_id: AtomicUsize,
    reject_formatted: AtomicBool,
    /// Plain sends still accepted before every further one is rejected.
    plain_budget: Mutex<Option<usize>>,
    rejected_substrings: Mutex<Vec<String>>,
}

impl MockChannel {
    /// Create a new mock channel with empty queues.
    pub fn new() -> Self {
        Self {
            inbound: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
            next_id: AtomicUsize::new(1),
            reject_formatted: AtomicBool::new(false),
            plain_budget: Mutex::new(None),
            rejected_substrings: Mutex::new(Vec::new()),
        }
    }

    /// Inject an inbound message into the receive queue.
    pub async fn inject_message(&self, msg: InboundMessage) {
        self.inbound.lock().await.push_back(msg);
        self.notify.notify_one();
    }

    /// Makes `receive()` fail with a "channel closed" error once the queue is empty.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    /// Rejects every send whose parse mode is not plain.
    pub fn reject_formatted_sends(&self, reject: bool) {
        self.reject_formatted.store(reject, Ordering::SeqCst);
    }

    /// Accepts `n` more plain sends, then rejects the rest.
    pub async fn fail_plain_sends_after(&self, n: usize) {
        *self.plain_budget.lock().await = Some(n);
    }

    /// Rejects every send whose text contains `needle`, in any parse mode.
    pub async fn reject_containing(&self, needle: &str) {
        self.rejected_substrings.lock().await.push(needle.to_string());
    }

    /// Get all messages that were sent through `send()`.
    pub async fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().await.clone()
    }

    /// Texts of the sent messages, in order.
    pub async fn sent_texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .map(|m| m.content.clone())
            .collect()
    }

    /// Get the count of sent messages.
    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    pub async fn deleted_messages(&self) -> Vec<(String, MessageId)> {
        self.deleted.lock().await.clone()
    }

    /// Clear all captured messages and deletions.
    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
        self.deleted.lock().await.clear();
    }

    fn rejected(reason: &str) -> KashError {
        KashError::Channel {
            message: reason.to_string(),
            source: None,
        }
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a text message from `user` in a private chat with the same id.
pub fn text_message(user: &str, text: &str) -> InboundMessage {
    inbound(user, InboundKind::Text(text.to_string()))
}

/// Builds an inbound message of any kind from `user`.
pub fn inbound(user: &str, kind: InboundKind) -> InboundMessage {
    static NEXT: AtomicUsize = AtomicUsize::new(1);
    InboundMessage {
        id: MessageId(format!("in-{}", NEXT.fetch_add(1, Ordering::Relaxed))),
        user_id: UserId::from(user),
        chat_id: user.to_string(),
        username: Some(format!("{user}-name")),
        kind,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}

#[async_trait]
impl PluginAdapter for MockChannel {
    fn name(&self) -> &str {
        "mock-channel"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, KashError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), KashError> {
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for MockChannel {
    fn capabilities(&self) -> ChannelCapabilities {
        ChannelCapabilities {
            supports_delete: true,
            supports_keyboard: true,
            max_message_length: None,
        }
    }

    async fn connect(&mut self) -> Result<(), KashError> {
        Ok(())
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, KashError> {
        let blocked = self
            .rejected_substrings
            .lock()
            .await
            .iter()
            .any(|needle| msg.content.contains(needle.as_str()));
        if blocked {
            return Err(Self::rejected("message rejected"));
        }

        if msg.parse_mode != ParseMode::Plain {
            if self.reject_formatted.load(Ordering::SeqCst) {
                return Err(Self::rejected("can't parse entities"));
            }
        } else if let Some(budget) = self.plain_budget.lock().await.as_mut() {
            if *budget == 0 {
                return Err(Self::rejected("message rejected"));
            }
            *budget -= 1;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.sent.lock().await.push(msg);
        Ok(MessageId(format!("mock-msg-{id}")))
    }

    async fn delete_message(&self, chat_id: &str, message_id: &MessageId) -> Result<(), KashError> {
        self.deleted
            .lock()
            .await
            .push((chat_id.to_string(), message_id.clone()));
        Ok(())
    }

    async fn receive(&self) -> Result<InboundMessage, KashError> {
        loop {
            {
                let mut queue = self.inbound.lock().await;
                if let Some(msg) = queue.pop_front() {
                    return Ok(msg);
                }
            }
            if self.closed.load(Ordering::SeqCst) {
                return Err(Self::rejected("channel closed"));
            }
            self.notify.notified().await;
        }
    }
}
