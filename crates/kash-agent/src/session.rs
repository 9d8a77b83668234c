// SPDX-FileCopyrightText: 2026 Kash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-message conversation state machine.
//!
//! One inbound text goes through:
//! Idle -> Admitted -> PersistedIn -> ContextBuilt -> Completing ->
//! PersistedOut -> Released -> Delivering -> Done.
//!
//! A denied admission ends in Rejected. Storage, model, transport and
//! empty-context faults release admission and end in Failed after the user
//! has been notified. A delivery fault ends in Done after one apology.
//! The orchestrator keeps no session object between messages; the history
//! log is the only state.

use std::sync::Arc;
use std::time::Duration;

use kash_config::model::{KashConfig, MessagesConfig};
use kash_core::types::{
    CompletionRequest, HistoryRecord, InboundKind, InboundMessage, MessageId, OutboundMessage,
    ParseMode,
};
use kash_core::{ChannelAdapter, FaultKind, HistoryStore, KashError, ProviderAdapter, UserId};
use strum::Display;
use tracing::{debug, error, info, warn};

use crate::admission::AdmissionGuard;
use crate::context::build_context;
use crate::delivery::{deliver, DeliveryOptions};

/// States of one conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SessionState {
    Idle,
    Admitted,
    PersistedIn,
    ContextBuilt,
    Completing,
    PersistedOut,
    Released,
    Delivering,
    Done,
    Rejected,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Done | SessionState::Rejected | SessionState::Failed
        )
    }
}

/// Outcome of handling one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub user_id: UserId,
    /// Terminal state.
    pub state: SessionState,
    /// Every state visited, starting with `Idle`.
    pub trail: Vec<SessionState>,
    pub fault: Option<FaultKind>,
    /// Reply messages delivered to the channel (notices not counted).
    pub chunks_delivered: usize,
}

impl SessionReport {
    fn new(user_id: &UserId) -> Self {
        Self {
            user_id: user_id.clone(),
            state: SessionState::Idle,
            trail: vec![SessionState::Idle],
            fault: None,
            chunks_delivered: 0,
        }
    }

    fn enter(&mut self, state: SessionState) {
        debug!(user_id = %self.user_id, from = %self.state, to = %state, "session transition");
        self.state = state;
        self.trail.push(state);
    }

    fn fail(&mut self, fault: FaultKind) {
        self.fault = Some(fault);
        self.enter(SessionState::Failed);
    }
}

/// Orchestrator settings, taken from [`KashConfig`].
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub agent_name: String,
    pub model: String,
    pub timeout: Duration,
    pub context_window: usize,
    pub max_message_length: usize,
    pub parse_mode: ParseMode,
    pub messages: MessagesConfig,
}

impl SessionSettings {
    pub fn from_config(config: &KashConfig) -> Self {
        Self {
            agent_name: config.agent.name.clone(),
            model: config.model.name.clone(),
            timeout: config.model.timeout(),
            context_window: config.history.context_window,
            max_message_length: config.telegram.max_message_length,
            parse_mode: config.telegram.parse_mode,
            messages: config.messages.clone(),
        }
    }
}

/// Composes admission, history, context, completion and delivery.
pub struct SessionOrchestrator {
    history: Arc<dyn HistoryStore>,
    provider: Arc<dyn ProviderAdapter>,
    channel: Arc<dyn ChannelAdapter>,
    admission: AdmissionGuard,
    settings: SessionSettings,
}

impl SessionOrchestrator {
    pub fn new(
        history: Arc<dyn HistoryStore>,
        provider: Arc<dyn ProviderAdapter>,
        channel: Arc<dyn ChannelAdapter>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            history,
            provider,
            channel,
            admission: AdmissionGuard::new(),
            settings,
        }
    }

    pub fn admission(&self) -> &AdmissionGuard {
        &self.admission
    }

    pub fn channel(&self) -> &Arc<dyn ChannelAdapter> {
        &self.channel
    }

    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.history
    }

    pub fn provider(&self) -> &Arc<dyn ProviderAdapter> {
        &self.provider
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Runs one inbound message to a terminal state.
    ///
    /// Never fails: every fault is turned into a user notice and recorded in
    /// the report.
    pub async fn handle_incoming_message(&self, msg: &InboundMessage) -> SessionReport {
        let mut report = SessionReport::new(&msg.user_id);

        let Some(permit) = self.admission.try_admit(&msg.user_id) else {
            let denied = KashError::AdmissionDenied {
                user_id: msg.user_id.to_string(),
            };
            self.notify_fault(msg, &denied).await;
            report.fault = Some(denied.fault_kind());
            report.enter(SessionState::Rejected);
            return report;
        };
        report.enter(SessionState::Admitted);

        match &msg.kind {
            InboundKind::Text(text) => {
                let pending = self.send_pending(&msg.chat_id).await;
                let outcome = self.converse(msg, text, &mut report).await;

                drop(permit);
                report.enter(SessionState::Released);
                if let Some(id) = pending {
                    self.delete_quietly(&msg.chat_id, &id).await;
                }

                match outcome {
                    Ok(reply) => self.deliver_reply(msg, &reply, &mut report).await,
                    Err(e) => {
                        self.notify_fault(msg, &e).await;
                        report.fail(e.fault_kind());
                    }
                }
            }
            InboundKind::Start => {
                let outcome = self.history.clear(&msg.user_id).await;
                drop(permit);
                report.enter(SessionState::Released);

                match outcome {
                    Ok(()) => {
                        info!(user_id = %msg.user_id, "history cleared on start");
                        let greeting = self.settings.messages.ready_for(&self.settings.agent_name);
                        self.notify(&msg.chat_id, &greeting).await;
                        report.enter(SessionState::Done);
                    }
                    Err(e) => {
                        self.notify_fault(msg, &e).await;
                        report.fail(e.fault_kind());
                    }
                }
            }
            InboundKind::ClearContext => {
                let outcome = self.write_forget_marker(msg).await;
                drop(permit);
                report.enter(SessionState::Released);

                match outcome {
                    Ok(()) => {
                        self.notify(&msg.chat_id, &self.settings.messages.context_cleared)
                            .await;
                        self.delete_quietly(&msg.chat_id, &msg.id).await;
                        report.enter(SessionState::Done);
                    }
                    Err(e) => {
                        self.notify_fault(msg, &e).await;
                        report.fail(e.fault_kind());
                    }
                }
            }
        }

        report
    }

    /// The admitted part of a text turn: persist, build context, complete,
    /// persist the reply. Runs while the permit is held.
    async fn converse(
        &self,
        msg: &InboundMessage,
        text: &str,
        report: &mut SessionReport,
    ) -> Result<String, KashError> {
        let user_id = &msg.user_id;

        self.history
            .append(
                user_id,
                HistoryRecord::new(user_id.clone(), msg.username.clone(), false, text),
            )
            .await?;
        report.enter(SessionState::PersistedIn);

        let records = self
            .history
            .read_tail(user_id, self.settings.context_window)
            .await?;
        let messages = build_context(&records);

        if messages.is_empty() {
            if let Err(e) = self.write_forget_marker(msg).await {
                error!(user_id = %user_id, error = %e, "failed to write forget marker");
            }
            return Err(KashError::EmptyContext {
                user_id: user_id.to_string(),
            });
        }
        report.enter(SessionState::ContextBuilt);

        debug!(user_id = %user_id, entries = messages.len(), "requesting completion");
        report.enter(SessionState::Completing);
        let reply = self
            .provider
            .complete(CompletionRequest {
                model: self.settings.model.clone(),
                messages,
                timeout: self.settings.timeout,
            })
            .await?;

        self.history
            .append(
                user_id,
                HistoryRecord::new(
                    user_id.clone(),
                    msg.username.clone(),
                    true,
                    reply.content.clone(),
                ),
            )
            .await?;
        report.enter(SessionState::PersistedOut);

        Ok(reply.content)
    }

    async fn deliver_reply(&self, msg: &InboundMessage, reply: &str, report: &mut SessionReport) {
        report.enter(SessionState::Delivering);

        let opts = DeliveryOptions {
            max_len: self.settings.max_message_length,
            parse_mode: self.settings.parse_mode,
            keyboard: true,
        };

        match deliver(self.channel.as_ref(), &msg.chat_id, reply, &opts).await {
            Ok(delivered) => {
                report.chunks_delivered = delivered.messages;
                info!(
                    user_id = %msg.user_id,
                    messages = delivered.messages,
                    split = delivered.split,
                    "reply delivered"
                );
            }
            Err(e) => {
                if let KashError::Delivery { delivered, .. } = &e {
                    report.chunks_delivered = *delivered;
                }
                self.notify_fault(msg, &e).await;
                report.fault = Some(e.fault_kind());
            }
        }
        report.enter(SessionState::Done);
    }

    async fn write_forget_marker(&self, msg: &InboundMessage) -> Result<(), KashError> {
        self.history
            .append(
                &msg.user_id,
                HistoryRecord::forget(msg.user_id.clone(), msg.username.clone()),
            )
            .await?;
        info!(user_id = %msg.user_id, "context cleared");
        Ok(())
    }

    /// Logs `err` at the severity of its fault kind and sends the matching notice.
    async fn notify_fault(&self, msg: &InboundMessage, err: &KashError) {
        let user_id = &msg.user_id;
        let kind = err.fault_kind();
        let texts = &self.settings.messages;

        match kind {
            FaultKind::AdmissionDenied => {
                info!(user_id = %user_id, fault = %kind, "request rejected, another one is in flight");
                self.notify(&msg.chat_id, &texts.busy).await;
            }
            FaultKind::EmptyContext => {
                warn!(user_id = %user_id, fault = %kind, "context window is empty");
                self.notify(&msg.chat_id, &texts.context_cleared).await;
                self.notify(&msg.chat_id, &texts.internal_error).await;
            }
            FaultKind::Model => {
                error!(user_id = %user_id, fault = %kind, error = %err, "completion failed");
                self.notify(&msg.chat_id, &texts.model_error).await;
            }
            FaultKind::Storage | FaultKind::Transport => {
                error!(user_id = %user_id, fault = %kind, error = %err, "request failed");
                self.notify(&msg.chat_id, &texts.internal_error).await;
            }
            FaultKind::Delivery => {
                error!(user_id = %user_id, fault = %kind, error = %err, "reply could not be delivered");
                self.notify(&msg.chat_id, &texts.delivery_error).await;
            }
        }
    }

    /// Sends a plain notice with the keyboard. Failures are logged.
    async fn notify(&self, chat_id: &str, text: &str) {
        if let Err(e) = self
            .channel
            .send(OutboundMessage::plain(chat_id, text).with_keyboard())
            .await
        {
            error!(chat_id, error = %e, "failed to send notice");
        }
    }

    async fn send_pending(&self, chat_id: &str) -> Option<MessageId> {
        match self
            .channel
            .send(OutboundMessage::plain(chat_id, &self.settings.messages.pending).with_keyboard())
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                debug!(chat_id, error = %e, "failed to send pending notice");
                None
            }
        }
    }

    async fn delete_quietly(&self, chat_id: &str, id: &MessageId) {
        if !self.channel.capabilities().supports_delete {
            return;
        }
        if let Err(e) = self.channel.delete_message(chat_id, id).await {
            debug!(chat_id, message_id = %id.0, error = %e, "failed to delete message");
        }
    }
}
