// SPDX-FileCopyrightText: 2026 Kash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for completion backends.

use async_trait::async_trait;

use crate::error::KashError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{CompletionReply, CompletionRequest};

/// Adapter for a language-model completion backend.
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    /// Issues exactly one completion call, bounded by `request.timeout`.
    ///
    /// A non-success status is reported as [`KashError::ModelStatus`];
    /// network failures, timeouts and malformed bodies as
    /// [`KashError::Provider`] or [`KashError::Timeout`]. Never retries.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionReply, KashError>;
}
