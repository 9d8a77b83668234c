// SPDX-FileCopyrightText: 2026 Kash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation orchestration for the Kash relay bot.
//!
//! The [`AgentLoop`] is the central coordinator that:
//! - Receives messages from a channel adapter
//! - Spawns one worker per message on a task tracker
//! - Hands each message to the [`SessionOrchestrator`]
//! - Drains in-flight workers on shutdown

pub mod admission;
pub mod context;
pub mod delivery;
pub mod session;
pub mod shutdown;
pub mod splitter;

use std::sync::Arc;
use std::time::Duration;

use kash_core::error::KashError;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, Instrument};

pub use admission::{AdmissionGuard, AdmissionPermit, AdmissionStats};
pub use context::build_context;
pub use delivery::{deliver, Delivered, DeliveryOptions};
pub use session::{SessionOrchestrator, SessionReport, SessionSettings, SessionState};
pub use splitter::split;

/// How long shutdown waits for in-flight requests.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Receives inbound messages and dispatches one worker task per message.
///
/// Workers for different users run concurrently; same-user concurrency is
/// resolved by the orchestrator's admission guard.
pub struct AgentLoop {
    orchestrator: Arc<SessionOrchestrator>,
    tracker: TaskTracker,
    drain_timeout: Duration,
}

impl AgentLoop {
    pub fn new(orchestrator: Arc<SessionOrchestrator>) -> Self {
        info!(
            agent_name = orchestrator.settings().agent_name.as_str(),
            "agent loop initialized"
        );
        Self {
            orchestrator,
            tracker: TaskTracker::new(),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Runs until `cancel` fires or the channel closes, then drains workers
    /// and shuts the adapters down.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), KashError> {
        info!("agent loop running");
        let channel = self.orchestrator.channel().clone();

        loop {
            tokio::select! {
                msg = channel.receive() => {
                    match msg {
                        Ok(inbound) => self.dispatch(inbound),
                        Err(e) => {
                            error!(error = %e, "channel receive error");
                            if e.to_string().contains("closed") {
                                break;
                            }
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping agent loop");
                    break;
                }
            }
        }

        shutdown::drain_workers(&self.tracker, self.drain_timeout).await;

        let stats = self.orchestrator.admission().stats();
        info!(
            granted = stats.granted,
            released = stats.released,
            denied = stats.denied,
            "admission totals"
        );

        self.orchestrator.channel().shutdown().await?;
        self.orchestrator.provider().shutdown().await?;
        self.orchestrator.history().shutdown().await?;

        info!("agent loop stopped");
        Ok(())
    }

    fn dispatch(&self, inbound: kash_core::types::InboundMessage) {
        debug!(user_id = %inbound.user_id, message_id = %inbound.id.0, "dispatching inbound message");
        let orchestrator = self.orchestrator.clone();
        let span = tracing::info_span!("session", user_id = %inbound.user_id);
        self.tracker.spawn(
            async move {
                let report = orchestrator.handle_incoming_message(&inbound).await;
                debug!(state = %report.state, fault = ?report.fault, "session finished");
            }
            .instrument(span),
        );
    }

    /// Number of workers still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }
}
