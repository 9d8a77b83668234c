// SPDX-FileCopyrightText: 2026 Kash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `kash serve` command implementation.
//!
//! Wires the JSON history store, the completion provider and the Telegram
//! channel into a [`SessionOrchestrator`] and runs the agent loop until a
//! shutdown signal arrives.

use std::sync::Arc;

use kash_agent::shutdown;
use kash_agent::{AgentLoop, SessionOrchestrator, SessionSettings};
use kash_config::KashConfig;
use kash_core::error::KashError;
use kash_core::{ChannelAdapter, HealthStatus, HistoryStore, PluginAdapter, ProviderAdapter};
use kash_history::JsonHistoryStore;
use kash_openai::OpenAiProvider;
use kash_telegram::TelegramChannel;
use tracing::{info, warn};

/// Runs the `kash serve` command.
pub async fn run_serve(config: KashConfig) -> Result<(), KashError> {
    let history = JsonHistoryStore::new(&config.history);
    let provider = OpenAiProvider::new(&config.model)?;
    let mut channel = TelegramChannel::new(&config.telegram, config.messages.clear_button.clone())?;

    report_health("history", &history).await;
    report_health("model", &provider).await;

    channel.connect().await?;
    info!(
        host = %config.model.host,
        model = %config.model.name,
        history = %config.history.path,
        "kash serving"
    );

    let history: Arc<dyn HistoryStore> = Arc::new(history);
    let provider: Arc<dyn ProviderAdapter> = Arc::new(provider);
    let channel: Arc<dyn ChannelAdapter> = Arc::new(channel);

    let orchestrator = Arc::new(SessionOrchestrator::new(
        history,
        provider,
        channel,
        SessionSettings::from_config(&config),
    ));

    let cancel = shutdown::install_signal_handler();
    AgentLoop::new(orchestrator).run(cancel).await?;

    info!("kash stopped");
    Ok(())
}

/// Logs an adapter's health. Startup continues either way.
async fn report_health(what: &str, adapter: &dyn PluginAdapter) {
    match adapter.health_check().await {
        Ok(HealthStatus::Healthy) => info!(adapter = adapter.name(), "{what} ready"),
        Ok(HealthStatus::Degraded(reason)) => {
            warn!(adapter = adapter.name(), reason = %reason, "{what} degraded")
        }
        Ok(HealthStatus::Unhealthy(reason)) => {
            warn!(adapter = adapter.name(), reason = %reason, "{what} unavailable")
        }
        Err(e) => warn!(adapter = adapter.name(), error = %e, "{what} health check failed"),
    }
}
