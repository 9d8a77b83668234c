// SPDX-FileCopyrightText: 2026 Kash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Flat-file history store.
//!
//! Each user owns one `history_{user_id}.json` file holding a JSON array of
//! [`HistoryRecord`]s in append order. Every append rewrites the whole file;
//! an interrupted write can leave it truncated, and the next read then
//! reports a storage error instead of guessing.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use kash_config::model::HistoryConfig;
use kash_core::traits::history::live_tail;
use kash_core::types::{HistoryRecord, UserId};
use kash_core::{AdapterType, HealthStatus, HistoryStore, KashError, PluginAdapter};
use tracing::debug;

/// History store backed by one JSON file per user.
pub struct JsonHistoryStore {
    root: PathBuf,
}

impl JsonHistoryStore {
    /// Creates a store rooted at `config.path`. Nothing touches the disk
    /// until the first append.
    pub fn new(config: &HistoryConfig) -> Self {
        Self::at(&config.path)
    }

    /// Creates a store rooted at an explicit directory.
    pub fn at(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Directory holding the history files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the log file for `user_id`.
    ///
    /// Ids are used verbatim in the file name, so anything that could step
    /// outside the history directory is refused.
    pub fn log_path(&self, user_id: &UserId) -> Result<PathBuf, KashError> {
        let id = user_id.as_str();
        let safe = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !safe {
            return Err(KashError::storage(format!(
                "user id {id:?} cannot be used as a history file name"
            )));
        }
        Ok(self.root.join(format!("history_{id}.json")))
    }

    async fn load(&self, path: &Path) -> Result<Vec<HistoryRecord>, KashError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                KashError::storage(format!("malformed history file {}: {e}", path.display()))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(KashError::storage(e)),
        }
    }
}

#[async_trait]
impl PluginAdapter for JsonHistoryStore {
    fn name(&self) -> &str {
        "json-history"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, KashError> {
        match tokio::fs::metadata(&self.root).await {
            Ok(meta) if meta.is_dir() => Ok(HealthStatus::Healthy),
            Ok(_) => Ok(HealthStatus::Unhealthy(format!(
                "{} is not a directory",
                self.root.display()
            ))),
            // Created lazily on first append.
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(HealthStatus::Degraded(format!(
                "{} does not exist yet",
                self.root.display()
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), KashError> {
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for JsonHistoryStore {
    async fn append(&self, user_id: &UserId, record: HistoryRecord) -> Result<(), KashError> {
        let path = self.log_path(user_id)?;
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(KashError::storage)?;

        let mut records = self.load(&path).await?;
        records.push(record);

        let bytes = serde_json::to_vec_pretty(&records).map_err(KashError::storage)?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(KashError::storage)?;

        debug!(user_id = %user_id, records = records.len(), "history appended");
        Ok(())
    }

    async fn read_tail(
        &self,
        user_id: &UserId,
        n: usize,
    ) -> Result<Vec<HistoryRecord>, KashError> {
        let records = self.read_all(user_id).await?;
        Ok(live_tail(&records, n).to_vec())
    }

    async fn read_all(&self, user_id: &UserId) -> Result<Vec<HistoryRecord>, KashError> {
        let path = self.log_path(user_id)?;
        self.load(&path).await
    }

    async fn clear(&self, user_id: &UserId) -> Result<(), KashError> {
        let path = self.log_path(user_id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(user_id = %user_id, "history deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(KashError::storage(e)),
        }
    }
}
