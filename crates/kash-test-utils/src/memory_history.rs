// SPDX-FileCopyrightText: 2026 Kash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory history store with fault injection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use kash_core::traits::history::live_tail;
use kash_core::types::{AdapterType, HealthStatus, HistoryRecord};
use kash_core::{HistoryStore, KashError, PluginAdapter, UserId};

/// History logs kept in a map, one `Vec` per user.
#[derive(Default)]
pub struct MemoryHistoryStore {
    logs: Mutex<HashMap<UserId, Vec<HistoryRecord>>>,
    fail_appends: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `append` fail with a storage error.
    pub fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Makes every read fail with a storage error.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of a user's full log.
    pub fn records(&self, user_id: &UserId) -> Vec<HistoryRecord> {
        self.logs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Texts of a user's full log.
    pub fn texts(&self, user_id: &UserId) -> Vec<String> {
        self.records(user_id).into_iter().map(|r| r.text).collect()
    }

    /// Replaces a user's log.
    pub fn seed(&self, user_id: &UserId, records: Vec<HistoryRecord>) {
        self.logs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user_id.clone(), records);
    }

    fn check(flag: &AtomicBool, op: &str) -> Result<(), KashError> {
        if flag.load(Ordering::SeqCst) {
            Err(KashError::storage(std::io::Error::other(format!(
                "injected {op} failure"
            ))))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PluginAdapter for MemoryHistoryStore {
    fn name(&self) -> &str {
        "memory-history"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, KashError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), KashError> {
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, user_id: &UserId, record: HistoryRecord) -> Result<(), KashError> {
        Self::check(&self.fail_appends, "append")?;
        self.logs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(user_id.clone())
            .or_default()
            .push(record);
        Ok(())
    }

    async fn read_tail(&self, user_id: &UserId, n: usize) -> Result<Vec<HistoryRecord>, KashError> {
        Self::check(&self.fail_reads, "read")?;
        let records = self.records(user_id);
        Ok(live_tail(&records, n).to_vec())
    }

    async fn read_all(&self, user_id: &UserId) -> Result<Vec<HistoryRecord>, KashError> {
        Self::check(&self.fail_reads, "read")?;
        Ok(self.records(user_id))
    }

    async fn clear(&self, user_id: &UserId) -> Result<(), KashError> {
        self.logs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(user_id);
        Ok(())
    }
}
