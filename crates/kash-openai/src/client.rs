// SPDX-FileCopyrightText: 2026 Kash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for OpenAI-compatible chat completion servers.

use std::time::Duration;

use kash_core::types::{ChatMessage, CompletionReply};
use kash_core::KashError;
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::types::{ChatCompletionRequest, ChatCompletionResponse};

const COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Builds `{host}/v1/chat/completions`, defaulting to plain `http://`.
pub fn completions_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.contains("://") {
        format!("{host}{COMPLETIONS_PATH}")
    } else {
        format!("http://{host}{COMPLETIONS_PATH}")
    }
}

/// Sends single completion requests. Holds a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct CompletionClient {
    client: reqwest::Client,
    url: String,
}

impl CompletionClient {
    /// Creates a client for the server at `host`.
    pub fn new(host: &str) -> Result<Self, KashError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| KashError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            url: completions_url(host),
        })
    }

    /// The completions endpoint this client posts to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issues a bare GET against the endpoint. Any HTTP answer counts as reachable.
    pub async fn probe(&self, timeout: Duration) -> Result<StatusCode, reqwest::Error> {
        let response = self.client.get(&self.url).timeout(timeout).send().await?;
        Ok(response.status())
    }

    /// Posts one request and returns `choices[0].message.content`.
    ///
    /// Only status 200 counts as success. No retries.
    pub async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        condition: Option<&str>,
        timeout: Duration,
    ) -> Result<CompletionReply, KashError> {
        let body = ChatCompletionRequest::new(model, messages, condition);

        let response = self
            .client
            .post(&self.url)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(e, timeout, "HTTP request failed"))?;

        let status = response.status();
        debug!(status = %status, url = %self.url, "completion response received");

        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "completion backend returned an error status");
            return Err(KashError::ModelStatus {
                status: status.as_u16(),
                body,
            });
        }

        let raw = response
            .text()
            .await
            .map_err(|e| transport_error(e, timeout, "failed to read response body"))?;

        let parsed: ChatCompletionResponse =
            serde_json::from_str(&raw).map_err(|e| KashError::Provider {
                message: format!("unexpected response body: {e}"),
                source: Some(Box::new(e)),
            })?;
        let model = parsed.model.clone();

        let content = parsed.first_content().ok_or_else(|| KashError::Provider {
            message: "response contains no choices".into(),
            source: None,
        })?;

        Ok(CompletionReply { content, model })
    }
}

fn transport_error(e: reqwest::Error, timeout: Duration, context: &str) -> KashError {
    if e.is_timeout() {
        KashError::Timeout { duration: timeout }
    } else {
        KashError::Provider {
            message: format!("{context}: {e}"),
            source: Some(Box::new(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kash_core::FaultKind;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn ok_body(text: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-1",
            "model": "openchat",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": text}}]
        })
    }

    #[test]
    fn url_defaults_to_http() {
        assert_eq!(
            completions_url("localhost:18888"),
            "http://localhost:18888/v1/chat/completions"
        );
        assert_eq!(
            completions_url("https://llm.example.com/"),
            "https://llm.example.com/v1/chat/completions"
        );
    }

    #[tokio::test]
    async fn success_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_json(serde_json::json!({
                "model": "openchat",
                "messages": [{"role": "user", "content": "hello"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("hi there")))
            .expect(1)
            .mount(&server)
            .await;

        let client = CompletionClient::new(&server.uri()).unwrap();
        let reply = client
            .complete("openchat", &[ChatMessage::user("hello")], None, TIMEOUT)
            .await
            .unwrap();
        assert_eq!(reply.content, "hi there");
        assert_eq!(reply.model.as_deref(), Some("openchat"));
    }

    #[tokio::test]
    async fn non_200_status_is_model_error_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
            .expect(1)
            .mount(&server)
            .await;

        let client = CompletionClient::new(&server.uri()).unwrap();
        let err = client
            .complete("m", &[ChatMessage::user("x")], None, TIMEOUT)
            .await
            .unwrap_err();
        assert_eq!(err.fault_kind(), FaultKind::Model);
        assert!(matches!(err, KashError::ModelStatus { status: 500, ref body } if body == "overloaded"));
    }

    #[tokio::test]
    async fn other_success_codes_are_still_model_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_body_json(ok_body("x")))
            .mount(&server)
            .await;

        let client = CompletionClient::new(&server.uri()).unwrap();
        let err = client
            .complete("m", &[ChatMessage::user("x")], None, TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, KashError::ModelStatus { status: 201, .. }));
    }

    #[tokio::test]
    async fn malformed_body_is_transport_fault() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let client = CompletionClient::new(&server.uri()).unwrap();
        let err = client
            .complete("m", &[ChatMessage::user("x")], None, TIMEOUT)
            .await
            .unwrap_err();
        assert_eq!(err.fault_kind(), FaultKind::Transport);
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(ok_body("late"))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = CompletionClient::new(&server.uri()).unwrap();
        let err = client
            .complete(
                "m",
                &[ChatMessage::user("x")],
                None,
                Duration::from_millis(200),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, KashError::Timeout { .. }));
        assert_eq!(err.fault_kind(), FaultKind::Transport);
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_fault() {
        // Port 9 (discard) on localhost is not expected to accept HTTP.
        let client = CompletionClient::new("127.0.0.1:9").unwrap();
        let err = client
            .complete("m", &[ChatMessage::user("x")], None, TIMEOUT)
            .await
            .unwrap_err();
        assert_eq!(err.fault_kind(), FaultKind::Transport);
    }
}
