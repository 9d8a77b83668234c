// SPDX-FileCopyrightText: 2026 Kash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for orchestrator scenarios.
//!
//! `TestHarness` wires a [`SessionOrchestrator`] to a mock provider, a mock
//! channel and an in-memory history store, and offers helpers that drive
//! whole conversation turns.

use std::sync::Arc;

use kash_agent::{SessionOrchestrator, SessionReport, SessionSettings};
use kash_config::model::KashConfig;
use kash_core::types::{InboundKind, InboundMessage};
use kash_core::UserId;

use crate::memory_history::MemoryHistoryStore;
use crate::mock_channel::{inbound, MockChannel};
use crate::mock_provider::{MockProvider, MockReply};

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    replies: Vec<MockReply>,
    config: KashConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = KashConfig::default();
        config.model.name = "test-model".to_string();
        Self {
            replies: Vec::new(),
            config,
        }
    }

    /// Set text replies of the mock provider.
    pub fn with_mock_responses(mut self, responses: Vec<String>) -> Self {
        self.replies = responses.into_iter().map(MockReply::Text).collect();
        self
    }

    /// Set scripted outcomes of the mock provider.
    pub fn with_mock_replies(mut self, replies: Vec<MockReply>) -> Self {
        self.replies = replies;
        self
    }

    pub fn with_context_window(mut self, n: usize) -> Self {
        self.config.history.context_window = n;
        self
    }

    pub fn with_max_message_length(mut self, n: usize) -> Self {
        self.config.telegram.max_message_length = n;
        self
    }

    /// Adjust any other setting.
    pub fn with_config(mut self, f: impl FnOnce(&mut KashConfig)) -> Self {
        f(&mut self.config);
        self
    }

    pub fn build(self) -> TestHarness {
        let mock_provider = Arc::new(MockProvider::with_replies(self.replies));
        let mock_channel = Arc::new(MockChannel::new());
        let history = Arc::new(MemoryHistoryStore::new());

        let orchestrator = Arc::new(SessionOrchestrator::new(
            history.clone(),
            mock_provider.clone(),
            mock_channel.clone(),
            SessionSettings::from_config(&self.config),
        ));

        TestHarness {
            mock_provider,
            mock_channel,
            history,
            orchestrator,
            config: self.config,
        }
    }
}

/// A complete test environment with mock adapters and in-memory history.
pub struct TestHarness {
    pub mock_provider: Arc<MockProvider>,
    pub mock_channel: Arc<MockChannel>,
    pub history: Arc<MemoryHistoryStore>,
    pub orchestrator: Arc<SessionOrchestrator>,
    pub config: KashConfig,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Sends a text message from `user` through the orchestrator.
    pub async fn send_text(&self, user: &str, text: &str) -> SessionReport {
        self.send(inbound(user, InboundKind::Text(text.to_string())))
            .await
    }

    /// Sends any inbound message through the orchestrator.
    pub async fn send(&self, msg: InboundMessage) -> SessionReport {
        self.orchestrator.handle_incoming_message(&msg).await
    }

    /// Full history log texts of `user`.
    pub fn history_texts(&self, user: &str) -> Vec<String> {
        self.history.texts(&UserId::from(user))
    }

    /// Texts sent to the channel so far.
    pub async fn sent_texts(&self) -> Vec<String> {
        self.mock_channel.sent_texts().await
    }
}
