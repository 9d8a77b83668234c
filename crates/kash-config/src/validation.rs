// SPDX-FileCopyrightText: 2026 Kash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::KashConfig;

/// Telegram rejects messages longer than this.
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

/// Validates semantic constraints serde cannot express.
///
/// Collects every failure instead of stopping at the first one.
pub fn validate_config(config: &KashConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.model.host.trim().is_empty() {
        fail("model.host must not be empty".into());
    }

    if config.model.timeout_secs == 0 {
        fail("model.timeout_secs must be at least 1".into());
    }

    if config.history.path.trim().is_empty() {
        fail("history.path must not be empty".into());
    }

    if config.history.context_window == 0 {
        fail("history.context_window must be at least 1".into());
    }

    let max_len = config.telegram.max_message_length;
    if max_len == 0 || max_len > TELEGRAM_MESSAGE_LIMIT {
        fail(format!(
            "telegram.max_message_length must be between 1 and {TELEGRAM_MESSAGE_LIMIT}, got {max_len}"
        ));
    }

    if config.messages.clear_button.trim().is_empty() {
        fail("messages.clear_button must not be empty".into());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
