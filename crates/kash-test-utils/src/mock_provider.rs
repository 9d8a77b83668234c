// SPDX-FileCopyrightText: 2026 Kash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock completion provider for deterministic testing.
//!
//! `MockProvider` implements `ProviderAdapter` with a FIFO of scripted
//! outcomes and records every request it receives. It can be paused so a
//! test can hold a request in flight while sending more messages.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};

use kash_core::traits::adapter::PluginAdapter;
use kash_core::traits::provider::ProviderAdapter;
use kash_core::types::{AdapterType, CompletionReply, CompletionRequest, HealthStatus};
use kash_core::KashError;

/// A scripted completion outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// Status 200 with this content.
    Text(String),
    /// The backend answered with a non-200 status.
    Status(u16, String),
    /// The request timed out.
    Timeout,
    /// The backend could not be reached.
    Unreachable,
}

impl MockReply {
    fn into_result(self, request: &CompletionRequest) -> Result<CompletionReply, KashError> {
        match self {
            MockReply::Text(content) => Ok(CompletionReply {
                content,
                model: Some(request.model.clone()),
            }),
            MockReply::Status(status, body) => Err(KashError::ModelStatus { status, body }),
            MockReply::Timeout => Err(KashError::Timeout {
                duration: request.timeout,
            }),
            MockReply::Unreachable => Err(KashError::Provider {
                message: "connection refused".into(),
                source: None,
            }),
        }
    }
}

/// A mock completion provider.
///
/// Replies are popped from a FIFO queue. When the queue is empty,
/// a default "mock response" text is returned.
pub struct MockProvider {
    replies: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<CompletionRequest>>,
    /// Open gate lets requests complete.
    gate: watch::Sender<bool>,
    /// Number of requests that reached the provider.
    started: watch::Sender<usize>,
}

impl MockProvider {
    /// Create a new mock provider with an empty reply queue.
    pub fn new() -> Self {
        Self::with_replies(Vec::new())
    }

    /// Create a mock provider pre-loaded with text replies.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self::with_replies(responses.into_iter().map(MockReply::Text).collect())
    }

    /// Create a mock provider pre-loaded with scripted outcomes.
    pub fn with_replies(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::from(replies)),
            requests: Mutex::new(Vec::new()),
            gate: watch::Sender::new(true),
            started: watch::Sender::new(0),
        }
    }

    /// Add an outcome to the end of the queue.
    pub async fn push(&self, reply: MockReply) {
        self.replies.lock().await.push_back(reply);
    }

    /// Holds every request until [`resume`](Self::resume) is called.
    pub fn pause(&self) {
        self.gate.send_replace(false);
    }

    pub fn resume(&self) {
        self.gate.send_replace(true);
    }

    /// Waits until at least `n` requests have reached the provider.
    pub async fn wait_for_calls(&self, n: usize, timeout: Duration) -> bool {
        let mut rx = self.started.subscribe();
        tokio::time::timeout(timeout, rx.wait_for(|count| *count >= n))
            .await
            .is_ok_and(|r| r.is_ok())
    }

    /// Every request received so far.
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, KashError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), KashError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionReply, KashError> {
        self.requests.lock().await.push(request.clone());
        self.started.send_modify(|count| *count += 1);

        let mut gate = self.gate.subscribe();
        let opened = gate.wait_for(|open| *open).await.is_ok();
        if !opened {
            return Err(KashError::Internal("mock provider dropped".into()));
        }

        let reply = self
            .replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| MockReply::Text("mock response".to_string()));
        reply.into_result(&request)
    }
}
