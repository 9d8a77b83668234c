// SPDX-FileCopyrightText: 2026 Kash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context window assembly from persisted history.

use kash_core::traits::history::forget_boundary;
use kash_core::types::{ChatMessage, HistoryRecord};

/// Turns a history slice into the role-tagged message list sent to the model.
///
/// Only records after the last `forget` marker are used, empty texts are
/// dropped, and chronological order is kept. The caller bounds the slice.
pub fn build_context(records: &[HistoryRecord]) -> Vec<ChatMessage> {
    forget_boundary(records)
        .iter()
        .filter(|r| !r.text.is_empty())
        .map(|r| ChatMessage {
            role: r.role(),
            content: r.text.clone(),
        })
        .collect()
}
