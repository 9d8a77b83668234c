// SPDX-FileCopyrightText: 2026 Kash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible completion provider for the Kash relay bot.
//!
//! Talks to any server exposing `/v1/chat/completions` (llama.cpp, vLLM,
//! OpenChat, ...). One synchronous request per call, no streaming.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use kash_config::model::ModelConfig;
use kash_core::types::{AdapterType, CompletionReply, CompletionRequest, HealthStatus};
use kash_core::{KashError, PluginAdapter, ProviderAdapter};
use tracing::info;

pub use client::CompletionClient;

/// Completion provider implementing [`ProviderAdapter`].
pub struct OpenAiProvider {
    client: CompletionClient,
    message_condition: Option<String>,
}

impl OpenAiProvider {
    /// Creates a provider for `config.host`.
    pub fn new(config: &ModelConfig) -> Result<Self, KashError> {
        let client = CompletionClient::new(&config.host)?;
        info!(url = client.url(), model = %config.name, "completion provider initialized");
        Ok(Self {
            client,
            message_condition: config.message_condition.clone(),
        })
    }
}

#[async_trait]
impl PluginAdapter for OpenAiProvider {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, KashError> {
        match self.client.probe(Duration::from_secs(5)).await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "completion backend unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), KashError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionReply, KashError> {
        self.client
            .complete(
                &request.model,
                &request.messages,
                self.message_condition.as_deref(),
                request.timeout,
            )
            .await
    }
}
