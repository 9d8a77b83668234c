// SPDX-FileCopyrightText: 2026 Kash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram channel adapter for the Kash relay bot.
//!
//! Implements [`ChannelAdapter`] for the Telegram Bot API via teloxide:
//! long polling for inbound text, formatted sends with the clear-context
//! reply keyboard, and message deletion.

pub mod handler;
pub mod markdown;

use std::borrow::Cow;

use async_trait::async_trait;
use kash_config::model::TelegramConfig;
use kash_core::error::KashError;
use kash_core::traits::{ChannelAdapter, PluginAdapter};
use kash_core::types::{
    AdapterType, ChannelCapabilities, HealthStatus, InboundMessage, MessageId, OutboundMessage,
    ParseMode,
};
use teloxide::prelude::*;
use teloxide::types::{
    ChatId, KeyboardButton, KeyboardMarkup, MessageId as TelegramMessageId,
    ParseMode as TelegramParseMode,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Hard limit of the Bot API for a single text message.
pub const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Telegram channel adapter implementing [`ChannelAdapter`].
pub struct TelegramChannel {
    bot: Bot,
    clear_button: String,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<InboundMessage>>,
    inbound_tx: mpsc::Sender<InboundMessage>,
    polling_handle: Option<tokio::task::JoinHandle<()>>,
}

impl TelegramChannel {
    /// Creates a new Telegram channel adapter.
    ///
    /// Requires `config.bot_token` to be set. `clear_button` is the label of
    /// the reply-keyboard button, recognised again when the user presses it.
    pub fn new(config: &TelegramConfig, clear_button: impl Into<String>) -> Result<Self, KashError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            KashError::Config("telegram.bot_token is required for the Telegram channel".into())
        })?;

        if token.trim().is_empty() {
            return Err(KashError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }

        let bot = Bot::new(token);
        let (inbound_tx, inbound_rx) = mpsc::channel(100);

        Ok(Self {
            bot,
            clear_button: clear_button.into(),
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            inbound_tx,
            polling_handle: None,
        })
    }

    /// Returns a reference to the underlying teloxide Bot.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    fn keyboard(&self) -> KeyboardMarkup {
        KeyboardMarkup::new(vec![vec![KeyboardButton::new(self.clear_button.clone())]])
            .resize_keyboard()
    }
}

/// Parses a chat id rendered by [`handler::to_inbound_message`].
fn parse_chat_id(chat_id: &str) -> Result<ChatId, KashError> {
    chat_id
        .parse::<i64>()
        .map(ChatId)
        .map_err(|e| KashError::Channel {
            message: format!("invalid chat_id {chat_id:?}: {e}"),
            source: None,
        })
}

/// Maps a parse mode to the Bot API one, escaping text where needed.
#[allow(deprecated)]
fn render(mode: ParseMode, text: &str) -> (Option<TelegramParseMode>, Cow<'_, str>) {
    match mode {
        ParseMode::Markdown => (Some(TelegramParseMode::Markdown), Cow::Borrowed(text)),
        ParseMode::MarkdownV2 => (
            Some(TelegramParseMode::MarkdownV2),
            Cow::Owned(markdown::escape_markdown_v2(text)),
        ),
        ParseMode::Plain => (None, Cow::Borrowed(text)),
    }
}

#[async_trait]
impl PluginAdapter for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, KashError> {
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), KashError> {
        debug!("Telegram channel shutting down");
        if let Some(handle) = &self.polling_handle {
            handle.abort();
        }
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for TelegramChannel {
    fn capabilities(&self) -> ChannelCapabilities {
        ChannelCapabilities {
            supports_delete: true,
            supports_keyboard: true,
            max_message_length: Some(TELEGRAM_MAX_MESSAGE_LENGTH),
        }
    }

    async fn connect(&mut self) -> Result<(), KashError> {
        if self.polling_handle.is_some() {
            return Ok(());
        }

        let bot = self.bot.clone();
        let tx = self.inbound_tx.clone();
        let clear_button = self.clear_button.clone();

        info!("starting Telegram long polling");

        let handle = tokio::spawn(async move {
            let handler = Update::filter_message().endpoint(move |msg: Message| {
                let tx = tx.clone();
                let clear_button = clear_button.clone();
                async move {
                    match handler::to_inbound_message(&msg, &clear_button) {
                        Some(inbound) => {
                            if tx.send(inbound).await.is_err() {
                                warn!("inbound channel closed, dropping message");
                            }
                        }
                        None => {
                            debug!(msg_id = msg.id.0, "ignoring non-text message");
                        }
                    }
                    respond(())
                }
            });

            Dispatcher::builder(bot, handler)
                .default_handler(|_| async {})
                .build()
                .dispatch()
                .await;
        });

        self.polling_handle = Some(handle);
        Ok(())
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, KashError> {
        let chat_id = parse_chat_id(&msg.chat_id)?;
        let (parse_mode, text) = render(msg.parse_mode, &msg.content);

        let mut request = self.bot.send_message(chat_id, text.into_owned());
        if let Some(mode) = parse_mode {
            request = request.parse_mode(mode);
        }
        if msg.keyboard {
            request = request.reply_markup(self.keyboard());
        }

        let sent = request.await.map_err(|e| KashError::Channel {
            message: format!("failed to send {} message: {e}", msg.parse_mode),
            source: Some(Box::new(e)),
        })?;

        Ok(MessageId(sent.id.0.to_string()))
    }

    async fn delete_message(&self, chat_id: &str, message_id: &MessageId) -> Result<(), KashError> {
        let chat_id = parse_chat_id(chat_id)?;
        let id = message_id
            .0
            .parse::<i32>()
            .map_err(|e| KashError::Channel {
                message: format!("invalid message_id {:?}: {e}", message_id.0),
                source: None,
            })?;

        self.bot
            .delete_message(chat_id, TelegramMessageId(id))
            .await
            .map_err(|e| KashError::Channel {
                message: format!("failed to delete message: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(())
    }

    async fn receive(&self) -> Result<InboundMessage, KashError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await.ok_or_else(|| KashError::Channel {
            message: "Telegram inbound channel closed".into(),
            source: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(token: Option<&str>) -> TelegramConfig {
        TelegramConfig {
            bot_token: token.map(str::to_string),
            ..TelegramConfig::default()
        }
    }

    #[test]
    fn new_requires_bot_token() {
        assert!(TelegramChannel::new(&config(None), "Clear").is_err());
    }

    #[test]
    fn new_rejects_empty_token() {
        assert!(TelegramChannel::new(&config(Some("  ")), "Clear").is_err());
    }

    #[test]
    fn new_accepts_valid_token() {
        let channel = TelegramChannel::new(
            &config(Some("123456:ABC-DEF1234ghIkl-zyx57W2v1u123ew11")),
            "Clear",
        );
        assert!(channel.is_ok());
    }

    #[test]
    fn capabilities_are_correct() {
        let channel = TelegramChannel::new(&config(Some("test:token")), "Clear").unwrap();
        let caps = channel.capabilities();
        assert!(caps.supports_delete);
        assert!(caps.supports_keyboard);
        assert_eq!(caps.max_message_length, Some(4096));
        assert_eq!(channel.name(), "telegram");
        assert_eq!(channel.adapter_type(), AdapterType::Channel);
    }

    #[test]
    fn chat_ids_parse() {
        assert_eq!(parse_chat_id("12345").unwrap(), ChatId(12345));
        assert_eq!(parse_chat_id("-100200").unwrap(), ChatId(-100200));
        assert!(parse_chat_id("abc").is_err());
    }

    #[test]
    fn markdown_v2_is_escaped() {
        let (mode, text) = render(ParseMode::MarkdownV2, "1.5 + 2");
        assert_eq!(mode, Some(TelegramParseMode::MarkdownV2));
        assert_eq!(text, "1\\.5 \\+ 2");
    }

    #[test]
    #[allow(deprecated)]
    fn legacy_markdown_passes_through() {
        let (mode, text) = render(ParseMode::Markdown, "*bold* 1.5");
        assert_eq!(mode, Some(TelegramParseMode::Markdown));
        assert_eq!(text, "*bold* 1.5");
    }

    #[test]
    fn plain_has_no_parse_mode() {
        let (mode, text) = render(ParseMode::Plain, "a_b");
        assert!(mode.is_none());
        assert_eq!(text, "a_b");
    }

    #[tokio::test]
    async fn shutdown_without_connect_is_ok() {
        let channel = TelegramChannel::new(&config(Some("test:token")), "Clear").unwrap();
        channel.shutdown().await.unwrap();
    }
}
