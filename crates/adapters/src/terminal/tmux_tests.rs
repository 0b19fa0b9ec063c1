// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::LazyLock;

/// Random prefix for this test run to avoid conflicts with parallel test runs.
static TEST_PREFIX: LazyLock<String> = LazyLock::new(|| {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    format!("t{:04x}", nanos & 0xFFFF)
});

/// Counter for generating unique pane names across parallel tests.
static PANE_COUNTER: AtomicU64 = AtomicU64::new(0);

fn unique_name(suffix: &str) -> String {
    let id = PANE_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}-{}-{}", *TEST_PREFIX, suffix, id)
}

/// Check if tmux is available on this system
fn tmux_available() -> bool {
    std::process::Command::new("tmux")
        .arg("-V")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

macro_rules! skip_without_tmux {
    () => {
        if !tmux_available() {
            eprintln!("skipping: tmux not available");
            return;
        }
    };
}

#[tokio::test]
#[serial(tmux)]
async fn spawn_creates_pane_and_returns_id() {
    skip_without_tmux!();
    let adapter = TmuxAdapter::new();
    let name = unique_name("spawn");

    let id = adapter
        .spawn(&name, Path::new("/tmp"), "sleep 60", &[])
        .await
        .unwrap();

    assert_eq!(id, format!("sesh-{}", name));
    assert!(adapter.exists(&id).await.unwrap());

    let _ = adapter.kill(&id).await;
}

#[tokio::test]
#[serial(tmux)]
async fn spawn_rejects_missing_cwd() {
    skip_without_tmux!();
    let adapter = TmuxAdapter::new();
    let err = adapter
        .spawn(
            &unique_name("cwd"),
            Path::new("/nonexistent/dir/for/sesh"),
            "sleep 1",
            &[],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TerminalError::SpawnFailed(_)));
}

#[tokio::test]
#[serial(tmux)]
async fn literal_text_lands_in_pane_without_submitting() {
    skip_without_tmux!();
    let adapter = TmuxAdapter::new();
    let name = unique_name("literal");

    let id = adapter
        .spawn(&name, Path::new("/tmp"), "cat", &[])
        .await
        .unwrap();

    adapter.send_literal_text(&id, "hello there").await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    // Text is typed but not yet echoed back by cat (no newline sent)
    let output = adapter.capture_pane(&id, false).await.unwrap();
    assert!(output.contains("hello there"));

    let _ = adapter.kill(&id).await;
}

#[tokio::test]
#[serial(tmux)]
async fn send_to_missing_pane_fails() {
    skip_without_tmux!();
    let adapter = TmuxAdapter::new();
    let err = adapter
        .send_literal_text("sesh-does-not-exist", "x")
        .await
        .unwrap_err();
    assert!(matches!(err, TerminalError::NotFound(_)));

    let err = adapter.send_submit_key("sesh-does-not-exist").await.unwrap_err();
    assert!(matches!(err, TerminalError::NotFound(_)));
}

#[tokio::test]
#[serial(tmux)]
async fn kill_is_idempotent() {
    skip_without_tmux!();
    let adapter = TmuxAdapter::new();
    let name = unique_name("kill");

    let id = adapter
        .spawn(&name, Path::new("/tmp"), "sleep 60", &[])
        .await
        .unwrap();

    adapter.kill(&id).await.unwrap();
    assert!(!adapter.exists(&id).await.unwrap());
    // Second kill of a dead pane is fine
    adapter.kill(&id).await.unwrap();
}

#[test]
fn shell_quote_escapes_single_quotes() {
    assert_eq!(shell_quote("/tmp/plain.log"), "'/tmp/plain.log'");
    assert_eq!(shell_quote("/tmp/it's.log"), "'/tmp/it'\\''s.log'");
}
