// SPDX-FileCopyrightText: 2026 Kash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! History store trait for per-user conversation logs.

use async_trait::async_trait;

use crate::error::KashError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{HistoryRecord, UserId};

/// Durable per-user append-only conversation log.
///
/// Implementations do not lock: callers guarantee that one user's log is
/// never touched by two tasks at once.
#[async_trait]
pub trait HistoryStore: PluginAdapter {
    /// Appends one record to the user's log, creating it if absent.
    async fn append(&self, user_id: &UserId, record: HistoryRecord) -> Result<(), KashError>;

    /// Returns the last `n` records with the forget boundary applied.
    async fn read_tail(&self, user_id: &UserId, n: usize)
        -> Result<Vec<HistoryRecord>, KashError>;

    /// Returns the whole log without truncation.
    async fn read_all(&self, user_id: &UserId) -> Result<Vec<HistoryRecord>, KashError>;

    /// Deletes the user's log. Deleting a missing log is not an error.
    async fn clear(&self, user_id: &UserId) -> Result<(), KashError>;
}

/// Keeps only the records strictly after the last forget marker.
pub fn forget_boundary(records: &[HistoryRecord]) -> &[HistoryRecord] {
    match records.iter().rposition(HistoryRecord::is_forget_marker) {
        Some(i) => &records[i + 1..],
        None => records,
    }
}

/// Takes the last `n` records, then applies [`forget_boundary`].
pub fn live_tail(records: &[HistoryRecord], n: usize) -> &[HistoryRecord] {
    let start = records.len().saturating_sub(n);
    forget_boundary(&records[start..])
}
