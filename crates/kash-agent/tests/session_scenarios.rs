// SPDX-FileCopyrightText: 2026 Kash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation turns driven through the orchestrator with mock adapters.

use std::sync::Arc;
use std::time::Duration;

use kash_agent::SessionState;
use kash_core::types::{ChatMessage, HistoryRecord, InboundKind, ParseMode};
use kash_core::{FaultKind, UserId, FORGET_SENTINEL};
use kash_test_utils::{inbound, MockReply, TestHarness};

const WAIT: Duration = Duration::from_secs(5);

fn seeded(user: &str, texts: &[(&str, bool)]) -> Vec<HistoryRecord> {
    texts
        .iter()
        .map(|(t, b)| HistoryRecord::new(UserId::from(user), None, *b, *t))
        .collect()
}

#[tokio::test]
async fn hello_gets_one_reply() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec!["hi there".into()])
        .build();

    let report = harness.send_text("u1", "hello").await;

    assert_eq!(report.state, SessionState::Done);
    assert_eq!(report.fault, None);
    assert_eq!(report.chunks_delivered, 1);
    assert_eq!(
        report.trail,
        vec![
            SessionState::Idle,
            SessionState::Admitted,
            SessionState::PersistedIn,
            SessionState::ContextBuilt,
            SessionState::Completing,
            SessionState::PersistedOut,
            SessionState::Released,
            SessionState::Delivering,
            SessionState::Done,
        ]
    );

    let requests = harness.mock_provider.requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].messages, vec![ChatMessage::user("hello")]);
    assert_eq!(requests[0].model, "test-model");

    let log = harness.history.records(&UserId::from("u1"));
    assert_eq!(log.len(), 2);
    assert!(!log[0].is_bot);
    assert!(log[1].is_bot);
    assert_eq!(log[1].text, "hi there");
    assert_eq!(log[0].username.as_deref(), Some("u1-name"));

    let sent = harness.mock_channel.sent_messages().await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].content, harness.config.messages.pending);
    assert_eq!(sent[1].content, "hi there");
    assert_eq!(sent[1].parse_mode, ParseMode::Markdown);
    assert!(sent.iter().all(|m| m.keyboard));

    // The pending notice is removed once the model has answered.
    let deleted = harness.mock_channel.deleted_messages().await;
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0].0, "u1");

    assert!(!harness.orchestrator.admission().is_admitted(&UserId::from("u1")));
}

#[tokio::test]
async fn follow_up_sees_previous_turn() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec!["first answer".into(), "second answer".into()])
        .build();

    harness.send_text("u1", "one").await;
    harness.send_text("u1", "two").await;

    let requests = harness.mock_provider.requests().await;
    assert_eq!(
        requests[1].messages,
        vec![
            ChatMessage::user("one"),
            ChatMessage::assistant("first answer"),
            ChatMessage::user("two"),
        ]
    );
}

#[tokio::test]
async fn same_user_concurrent_message_is_rejected() {
    let harness = Arc::new(
        TestHarness::builder()
            .with_mock_responses(vec!["slow answer".into()])
            .build(),
    );
    harness.mock_provider.pause();

    let first = {
        let harness = harness.clone();
        tokio::spawn(async move { harness.send_text("u1", "first").await })
    };
    assert!(harness.mock_provider.wait_for_calls(1, WAIT).await);

    let second = harness.send_text("u1", "second").await;
    assert_eq!(second.state, SessionState::Rejected);
    assert_eq!(second.fault, Some(FaultKind::AdmissionDenied));
    assert_eq!(harness.history_texts("u1"), vec!["first"]);
    assert!(
        harness
            .sent_texts()
            .await
            .contains(&harness.config.messages.busy)
    );

    harness.mock_provider.resume();
    let first = first.await.unwrap();
    assert_eq!(first.state, SessionState::Done);
    assert_eq!(harness.history_texts("u1"), vec!["first", "slow answer"]);
    assert_eq!(harness.mock_provider.call_count().await, 1);
}

#[tokio::test]
async fn other_users_are_not_blocked() {
    let harness = Arc::new(TestHarness::builder().build());
    harness.mock_provider.pause();

    let first = {
        let harness = harness.clone();
        tokio::spawn(async move { harness.send_text("u1", "first").await })
    };
    assert!(harness.mock_provider.wait_for_calls(1, WAIT).await);

    let other = {
        let harness = harness.clone();
        tokio::spawn(async move { harness.send_text("u2", "hello").await })
    };
    assert!(harness.mock_provider.wait_for_calls(2, WAIT).await);
    assert_eq!(harness.orchestrator.admission().in_flight(), 2);

    harness.mock_provider.resume();
    assert_eq!(first.await.unwrap().state, SessionState::Done);
    assert_eq!(other.await.unwrap().state, SessionState::Done);
}

#[tokio::test]
async fn backend_error_status_sends_degraded_message() {
    let harness = TestHarness::builder()
        .with_mock_replies(vec![MockReply::Status(500, "overloaded".into())])
        .build();

    let report = harness.send_text("u1", "hello").await;

    assert_eq!(report.state, SessionState::Failed);
    assert_eq!(report.fault, Some(FaultKind::Model));
    assert!(report.trail.contains(&SessionState::Released));
    assert!(!report.trail.contains(&SessionState::PersistedOut));
    assert_eq!(harness.history_texts("u1"), vec!["hello"]);
    assert_eq!(
        harness.sent_texts().await.last(),
        Some(&harness.config.messages.model_error)
    );
    assert!(!harness.orchestrator.admission().is_admitted(&UserId::from("u1")));
}

#[tokio::test]
async fn timeout_is_an_internal_error() {
    let harness = TestHarness::builder()
        .with_mock_replies(vec![MockReply::Timeout])
        .build();

    let report = harness.send_text("u1", "hello").await;

    assert_eq!(report.fault, Some(FaultKind::Transport));
    assert_eq!(
        harness.sent_texts().await.last(),
        Some(&harness.config.messages.internal_error)
    );
}

#[tokio::test]
async fn storage_failure_skips_the_model() {
    let harness = TestHarness::builder().build();
    harness.history.fail_appends(true);

    let report = harness.send_text("u1", "hello").await;

    assert_eq!(report.state, SessionState::Failed);
    assert_eq!(report.fault, Some(FaultKind::Storage));
    assert_eq!(harness.mock_provider.call_count().await, 0);
    assert_eq!(
        harness.sent_texts().await.last(),
        Some(&harness.config.messages.internal_error)
    );
    assert_eq!(harness.orchestrator.admission().in_flight(), 0);
}

#[tokio::test]
async fn forget_marker_limits_context() {
    let harness = TestHarness::builder().build();
    harness.history.seed(
        &UserId::from("u1"),
        seeded(
            "u1",
            &[("old", false), ("old reply", true), (FORGET_SENTINEL, false)],
        ),
    );

    harness.send_text("u1", "fresh").await;

    let requests = harness.mock_provider.requests().await;
    assert_eq!(requests[0].messages, vec![ChatMessage::user("fresh")]);
}

#[tokio::test]
async fn context_window_is_bounded() {
    let harness = TestHarness::builder().with_context_window(3).build();
    let history: Vec<(String, bool)> = (0..10).map(|i| (format!("m{i}"), i % 2 == 1)).collect();
    let borrowed: Vec<(&str, bool)> = history.iter().map(|(t, b)| (t.as_str(), *b)).collect();
    harness
        .history
        .seed(&UserId::from("u1"), seeded("u1", &borrowed));

    harness.send_text("u1", "latest").await;

    let messages = &harness.mock_provider.requests().await[0].messages;
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[2], ChatMessage::user("latest"));
}

#[tokio::test]
async fn empty_context_clears_and_reports() {
    let harness = TestHarness::builder().build();

    // The inbound text itself is the sentinel, so nothing is live afterwards.
    let report = harness.send_text("u1", FORGET_SENTINEL).await;

    assert_eq!(report.state, SessionState::Failed);
    assert_eq!(report.fault, Some(FaultKind::EmptyContext));
    assert!(!report.trail.contains(&SessionState::ContextBuilt));
    assert_eq!(harness.mock_provider.call_count().await, 0);
    assert_eq!(
        harness.history_texts("u1"),
        vec![FORGET_SENTINEL, FORGET_SENTINEL]
    );

    let sent = harness.sent_texts().await;
    let tail = &sent[sent.len() - 2..];
    assert_eq!(tail[0], harness.config.messages.context_cleared);
    assert_eq!(tail[1], harness.config.messages.internal_error);
}

#[tokio::test]
async fn long_reply_is_split_into_plain_chunks() {
    let line = "0123456789 ".repeat(9);
    let reply: String = std::iter::repeat_n(line.as_str(), 101)
        .collect::<Vec<_>>()
        .join("\n");
    assert!(reply.chars().count() >= 10_000);

    let harness = TestHarness::builder()
        .with_mock_responses(vec![reply.clone()])
        .build();

    let report = harness.send_text("u1", "write a lot").await;

    assert_eq!(report.state, SessionState::Done);
    assert!(report.chunks_delivered >= 4);

    let sent = harness.mock_channel.sent_messages().await;
    let chunks: Vec<_> = sent[1..].to_vec();
    assert_eq!(chunks.len(), report.chunks_delivered);
    assert!(chunks.iter().all(|m| m.content.chars().count() <= 3000));
    assert!(chunks.iter().all(|m| m.parse_mode == ParseMode::Plain));
    let joined = chunks
        .iter()
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    assert_eq!(joined, reply);
}

#[tokio::test]
async fn rejected_markup_falls_back_to_plain() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec!["*unbalanced".into()])
        .build();
    harness.mock_channel.reject_formatted_sends(true);

    let report = harness.send_text("u1", "hello").await;

    assert_eq!(report.state, SessionState::Done);
    assert_eq!(report.fault, None);
    let sent = harness.mock_channel.sent_messages().await;
    let last = sent.last().unwrap();
    assert_eq!(last.content, "*unbalanced");
    assert_eq!(last.parse_mode, ParseMode::Plain);
}

#[tokio::test]
async fn failed_plain_delivery_sends_one_apology() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec!["fine line\nBROKEN line".into()])
        .build();
    harness.mock_channel.reject_containing("BROKEN").await;

    let report = harness.send_text("u1", "hello").await;

    assert_eq!(report.state, SessionState::Done);
    assert_eq!(report.fault, Some(FaultKind::Delivery));
    assert_eq!(report.chunks_delivered, 0);
    // The reply was persisted before delivery started.
    assert_eq!(
        harness.history_texts("u1"),
        vec!["hello", "fine line\nBROKEN line"]
    );

    let apologies = harness
        .sent_texts()
        .await
        .into_iter()
        .filter(|t| *t == harness.config.messages.delivery_error)
        .count();
    assert_eq!(apologies, 1);
}

#[tokio::test]
async fn partial_delivery_counts_sent_chunks() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec!["fine line\nBROKEN line".into()])
        .with_max_message_length(12)
        .build();
    harness.mock_channel.reject_containing("BROKEN").await;

    let report = harness.send_text("u1", "hello").await;

    assert_eq!(report.fault, Some(FaultKind::Delivery));
    assert_eq!(report.chunks_delivered, 1);
    let texts = harness.sent_texts().await;
    assert!(texts.contains(&"fine line".to_string()));
    assert_eq!(texts.last(), Some(&harness.config.messages.delivery_error));
}

#[tokio::test]
async fn empty_model_reply_gets_an_apology() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec![String::new()])
        .build();
    harness.mock_channel.reject_formatted_sends(true);

    let report = harness.send_text("u1", "hello").await;

    assert_eq!(report.state, SessionState::Done);
    assert_eq!(report.fault, Some(FaultKind::Delivery));
    assert_eq!(report.chunks_delivered, 0);
    assert_eq!(
        harness.sent_texts().await,
        vec![
            harness.config.messages.pending.clone(),
            harness.config.messages.delivery_error.clone(),
        ]
    );
}

#[tokio::test]
async fn start_clears_history_and_greets() {
    let harness = TestHarness::builder()
        .with_config(|c| c.agent.name = "Kash".into())
        .build();
    harness.history.seed(
        &UserId::from("u1"),
        seeded("u1", &[("a", false), ("b", true)]),
    );

    let report = harness.send(inbound("u1", InboundKind::Start)).await;

    assert_eq!(report.state, SessionState::Done);
    assert!(harness.history_texts("u1").is_empty());
    let sent = harness.mock_channel.sent_messages().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].content, "Kash is ready");
    assert!(sent[0].keyboard);
}

#[tokio::test]
async fn clear_button_writes_forget_marker() {
    let harness = TestHarness::builder().build();
    harness
        .history
        .seed(&UserId::from("u1"), seeded("u1", &[("a", false)]));

    let msg = inbound("u1", InboundKind::ClearContext);
    let report = harness.send(msg.clone()).await;

    assert_eq!(report.state, SessionState::Done);
    let log = harness.history.records(&UserId::from("u1"));
    assert_eq!(log.len(), 2);
    assert!(log[1].is_forget_marker());
    assert!(!log[1].is_bot);
    assert_eq!(
        harness.sent_texts().await,
        vec![harness.config.messages.context_cleared.clone()]
    );
    assert_eq!(
        harness.mock_channel.deleted_messages().await,
        vec![("u1".to_string(), msg.id)]
    );
}

#[tokio::test]
async fn commands_respect_admission() {
    let harness = Arc::new(TestHarness::builder().build());
    harness.mock_provider.pause();

    let turn = {
        let harness = harness.clone();
        tokio::spawn(async move { harness.send_text("u1", "question").await })
    };
    assert!(harness.mock_provider.wait_for_calls(1, WAIT).await);

    let start = harness.send(inbound("u1", InboundKind::Start)).await;
    assert_eq!(start.state, SessionState::Rejected);
    assert_eq!(harness.history_texts("u1"), vec!["question"]);

    harness.mock_provider.resume();
    turn.await.unwrap();
}

#[tokio::test]
async fn releases_match_grants_under_faults() {
    let harness = TestHarness::builder()
        .with_mock_replies(vec![
            MockReply::Text("ok".into()),
            MockReply::Status(502, "bad gateway".into()),
            MockReply::Timeout,
            MockReply::Unreachable,
            MockReply::Text("ok again".into()),
        ])
        .build();

    for i in 0..5 {
        harness.send_text(&format!("u{i}"), "hello").await;
    }
    harness.history.fail_appends(true);
    harness.send_text("u9", "hello").await;
    harness.history.fail_appends(false);
    harness.send_text("u9", FORGET_SENTINEL).await;

    let stats = harness.orchestrator.admission().stats();
    assert_eq!(stats.granted, 7);
    assert_eq!(stats.released, stats.granted);
    assert_eq!(harness.orchestrator.admission().in_flight(), 0);
}
