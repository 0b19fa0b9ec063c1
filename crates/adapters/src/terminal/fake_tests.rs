// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn records_calls_in_order() {
    let adapter = FakeTerminalAdapter::new();
    adapter.add_pane("p1");

    adapter.send_cancel_key("p1").await.unwrap();
    adapter.send_literal_text("p1", "hello").await.unwrap();
    adapter.send_submit_key("p1").await.unwrap();

    let calls = adapter.injection_calls();
    assert_eq!(
        calls,
        vec![
            TerminalCall::SendCancelKey { pane: "p1".into() },
            TerminalCall::SendLiteralText {
                pane: "p1".into(),
                text: "hello".into()
            },
            TerminalCall::SendSubmitKey { pane: "p1".into() },
        ]
    );
}

#[tokio::test]
async fn scripted_capture_and_tail() {
    let adapter = FakeTerminalAdapter::new();
    adapter.add_pane("p1");
    adapter.set_capture("p1", "line1\nline2\nline3");

    let full = adapter.capture_pane("p1", true).await.unwrap();
    assert_eq!(full, "line1\nline2\nline3");

    let tail = adapter.capture_last("p1", 2).await.unwrap();
    assert_eq!(tail, "line2\nline3");
}

#[tokio::test]
async fn dead_pane_rejects_sends() {
    let adapter = FakeTerminalAdapter::new();
    adapter.add_pane("p1");
    adapter.set_dead("p1");

    assert!(adapter.send_literal_text("p1", "x").await.is_err());
    assert!(!adapter.exists("p1").await.unwrap());
}

#[tokio::test]
async fn forced_failures_are_one_shot() {
    let adapter = FakeTerminalAdapter::new();
    adapter.add_pane("p1");

    adapter.fail_next_literal();
    assert!(adapter.send_literal_text("p1", "a").await.is_err());
    assert!(adapter.send_literal_text("p1", "b").await.is_ok());

    adapter.fail_next_submit();
    assert!(adapter.send_submit_key("p1").await.is_err());
    assert!(adapter.send_submit_key("p1").await.is_ok());
}

#[tokio::test]
async fn spawn_registers_live_pane() {
    let adapter = FakeTerminalAdapter::new();
    let id = adapter
        .spawn("worker", std::path::Path::new("/tmp"), "claude", &[])
        .await
        .unwrap();
    assert_eq!(id, "sesh-worker");
    assert!(adapter.exists(&id).await.unwrap());
}
