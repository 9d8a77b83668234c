// SPDX-FileCopyrightText: 2026 Kash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the relay pipeline.
//!
//! Each test wires the real JSON history store (in a temp dir) and the real
//! completion provider (against a wiremock backend) to a mock channel.

use std::sync::Arc;
use std::time::Duration;

use kash_agent::{SessionOrchestrator, SessionSettings, SessionState};
use kash_config::KashConfig;
use kash_core::{FaultKind, HistoryStore, UserId};
use kash_history::JsonHistoryStore;
use kash_openai::OpenAiProvider;
use kash_test_utils::{text_message, MockChannel};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Relay {
    orchestrator: Arc<SessionOrchestrator>,
    channel: Arc<MockChannel>,
    history: Arc<JsonHistoryStore>,
    config: KashConfig,
    _dir: TempDir,
}

fn completion(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "model": "local",
        "choices": [{"message": {"role": "assistant", "content": content}}],
    }))
}

async fn relay(server: &MockServer, tweak: impl FnOnce(&mut KashConfig)) -> Relay {
    let dir = TempDir::new().unwrap();
    let mut config = KashConfig::default();
    config.model.host = server.uri();
    config.model.name = "local".into();
    config.history.path = dir.path().display().to_string();
    tweak(&mut config);

    let history = Arc::new(JsonHistoryStore::new(&config.history));
    let provider = Arc::new(OpenAiProvider::new(&config.model).unwrap());
    let channel = Arc::new(MockChannel::new());
    let orchestrator = Arc::new(SessionOrchestrator::new(
        history.clone(),
        provider,
        channel.clone(),
        SessionSettings::from_config(&config),
    ));

    Relay {
        orchestrator,
        channel,
        history,
        config,
        _dir: dir,
    }
}

#[tokio::test]
async fn hello_round_trip_persists_both_turns() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(completion("hi there"))
        .expect(1)
        .mount(&server)
        .await;

    let relay = relay(&server, |c| {
        c.model.message_condition = Some("GPT4 Correct".into());
    })
    .await;

    let report = relay
        .orchestrator
        .handle_incoming_message(&text_message("42", "hello"))
        .await;

    assert_eq!(report.state, SessionState::Done);
    assert_eq!(relay.channel.sent_texts().await.last().unwrap(), "hi there");

    let log = relay.history.read_all(&UserId::from("42")).await.unwrap();
    let texts: Vec<_> = log.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, vec!["hello", "hi there"]);
    assert!(relay.history.log_path(&UserId::from("42")).unwrap().exists());

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["model"], "local");
    assert_eq!(body["messages"][0]["content"], "hello");
    assert_eq!(body["messages"][0]["condition"], "GPT4 Correct");
}

#[tokio::test]
async fn backend_failure_reports_model_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let relay = relay(&server, |_| {}).await;
    let report = relay
        .orchestrator
        .handle_incoming_message(&text_message("42", "hello"))
        .await;

    assert_eq!(report.state, SessionState::Failed);
    assert_eq!(report.fault, Some(FaultKind::Model));
    assert_eq!(
        relay.channel.sent_texts().await.last(),
        Some(&relay.config.messages.model_error)
    );
    let log = relay.history.read_all(&UserId::from("42")).await.unwrap();
    assert_eq!(log.len(), 1);
}

#[tokio::test]
async fn long_reply_is_split_into_plain_chunks() {
    let line = "x".repeat(99);
    let long = vec![line.as_str(); 100].join("\n");
    assert_eq!(long.chars().count(), 9999);

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(completion(&long))
        .mount(&server)
        .await;

    let relay = relay(&server, |_| {}).await;
    let report = relay
        .orchestrator
        .handle_incoming_message(&text_message("42", "tell me everything"))
        .await;

    assert_eq!(report.state, SessionState::Done);
    assert!(report.chunks_delivered >= 4);

    let sent = relay.channel.sent_messages().await;
    let chunks: Vec<_> = sent
        .iter()
        .filter(|m| m.content != relay.config.messages.pending)
        .collect();
    assert_eq!(chunks.len(), report.chunks_delivered);
    assert!(chunks.iter().all(|m| m.content.chars().count() <= 3000));
    assert_eq!(
        chunks.iter().map(|m| m.content.len()).sum::<usize>() + chunks.len() - 1,
        long.len()
    );
}

#[tokio::test]
async fn concurrent_message_from_same_user_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(completion("slow").set_delay(Duration::from_millis(500)))
        .expect(1)
        .mount(&server)
        .await;

    let relay = Arc::new(relay(&server, |_| {}).await);
    let first = {
        let relay = relay.clone();
        tokio::spawn(async move {
            relay
                .orchestrator
                .handle_incoming_message(&text_message("42", "first"))
                .await
        })
    };

    let user = UserId::from("42");
    tokio::time::timeout(Duration::from_secs(5), async {
        while !relay.orchestrator.admission().is_admitted(&user) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    let second = relay
        .orchestrator
        .handle_incoming_message(&text_message("42", "second"))
        .await;
    assert_eq!(second.state, SessionState::Rejected);

    assert_eq!(first.await.unwrap().state, SessionState::Done);
    let log = relay.history.read_all(&user).await.unwrap();
    let texts: Vec<_> = log.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, vec!["first", "slow"]);
}
