// SPDX-FileCopyrightText: 2026 Kash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Kash integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic tests without Telegram or a model server.
//!
//! # Components
//!
//! - [`MockProvider`] - Completion provider with scripted replies and faults
//! - [`MockChannel`] - Chat channel with message injection and capture
//! - [`MemoryHistoryStore`] - In-memory history logs with fault injection
//! - [`TestHarness`] - Orchestrator wired to all three

pub mod harness;
pub mod memory_history;
pub mod mock_channel;
pub mod mock_provider;

pub use harness::TestHarness;
pub use memory_history::MemoryHistoryStore;
pub use mock_channel::{inbound, text_message, MockChannel};
pub use mock_provider::{MockProvider, MockReply};
