// SPDX-FileCopyrightText: 2026 Kash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the `/v1/chat/completions` endpoint.

use kash_core::types::{ChatMessage, Role};
use serde::{Deserialize, Serialize};

/// Request body.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<WireMessage<'a>>,
}

impl<'a> ChatCompletionRequest<'a> {
    /// Builds the body, tagging every message with `condition` when set.
    pub fn new(model: &'a str, messages: &'a [ChatMessage], condition: Option<&'a str>) -> Self {
        Self {
            model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role,
                    condition,
                    content: &m.content,
                })
                .collect(),
        }
    }
}

/// One message of the request body.
#[derive(Debug, Serialize)]
pub struct WireMessage<'a> {
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<&'a str>,
    pub content: &'a str,
}

/// The part of the response body the relay reads.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub model: Option<String>,
    pub choices: Vec<Choice>,
}

impl ChatCompletionResponse {
    /// Text at `choices[0].message.content`.
    pub fn first_content(self) -> Option<String> {
        self.choices.into_iter().next().map(|c| c.message.content)
    }
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    pub content: String,
}
