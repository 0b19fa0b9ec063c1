// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::config::EngineConfig;
use sesh_core::SessionId;
use tempfile::TempDir;
use yare::parameterized;

fn tracker() -> (IdleTracker, TempDir) {
    let dir = TempDir::new().unwrap();
    let config = Arc::new(EngineConfig::for_tests(dir.path()));
    (IdleTracker::new(config), dir)
}

// ---------------------------------------------------------------------------
// Prompt inspection
// ---------------------------------------------------------------------------

#[parameterized(
    bare_prompt = { ">", true },
    prompt_with_trailing_ws = { ">   ", true },
    prompt_then_blank_lines = { ">\n\n\n", true },
    typed_but_unsubmitted = { "> draft reply", false },
    mid_output = { "Running tests...\nstill going", false },
    prompt_not_last = { ">\nmore output came after", false },
    empty_capture = { "", false },
)]
fn claude_prompt_detection(capture: &str, expected: bool) {
    assert_eq!(pane_shows_idle(">", capture), expected);
}

#[test]
fn prompt_detection_uses_last_non_empty_line() {
    let capture = "some output\nmore output\n>\n   \n";
    assert!(pane_shows_idle(">", capture));
}

#[test]
fn codex_glyph_is_distinct() {
    assert!(pane_shows_idle("›", "done\n›\n"));
    assert!(!pane_shows_idle("›", "done\n>\n"));
}

#[test]
fn leading_whitespace_is_not_a_prompt() {
    // Only trailing whitespace is trimmed; an indented glyph is not the
    // composer's prompt column.
    assert!(!pane_shows_idle(">", "  >\n"));
}

// ---------------------------------------------------------------------------
// Stop-signal routing (scenarios B and C)
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stop_signal_without_fence_marks_idle() {
    let (tracker, _dir) = tracker();
    assert_eq!(tracker.on_stop_signal("s1"), StopSignalOutcome::Idle);
    assert!(tracker.is_idle("s1"));
}

#[tokio::test]
async fn handoff_across_clear_hook() {
    // Scenario B: fence armed, clear hook 2 polls later is absorbed AND
    // fires the pending-handoff branch; fence fully drains.
    let (tracker, _dir) = tracker();
    tracker.mark_active("s1");
    tracker.arm_skip_fence("s1");
    tracker.set_pending_handoff("s1", PathBuf::from("/tmp/resume.md"), None);

    let outcome = tracker.on_stop_signal("s1");
    assert_eq!(
        outcome,
        StopSignalOutcome::Handoff {
            continuation: PathBuf::from("/tmp/resume.md"),
            dump: None,
        }
    );

    // is_idle stays false, fence fully drained
    assert!(!tracker.is_idle("s1"));
    tracker.with_state("s1", |s| {
        assert_eq!(s.stop_notify_skip_count, 0);
        assert!(s.skip_count_armed_at.is_none());
        assert!(s.pending_handoff_path.is_none());
    });
}

#[tokio::test]
async fn absorbed_stop_without_handoff_stays_running() {
    let (tracker, _dir) = tracker();
    tracker.mark_active("s1");
    tracker.arm_skip_fence("s1");

    assert_eq!(tracker.on_stop_signal("s1"), StopSignalOutcome::Absorbed);
    assert!(!tracker.is_idle("s1"));
}

#[tokio::test]
async fn lost_clear_hook_expires_fence() {
    // Scenario C: no hook arrives within the TTL; a genuine stop after the
    // TTL resets the fence and transitions to idle normally.
    let (tracker, _dir) = tracker();
    tracker.mark_active("s1");
    tracker.arm_skip_fence("s1");
    tracker.set_pending_handoff("s1", PathBuf::from("/tmp/resume.md"), None);

    // for_tests TTL is 200ms
    tokio::time::sleep(std::time::Duration::from_millis(250)).await;

    assert_eq!(tracker.on_stop_signal("s1"), StopSignalOutcome::Idle);
    assert!(tracker.is_idle("s1"));
    tracker.with_state("s1", |s| {
        assert_eq!(s.stop_notify_skip_count, 0);
        assert!(s.skip_count_armed_at.is_none());
        // Abandoned handoff does not linger
        assert!(s.pending_handoff_path.is_none());
    });
}

#[tokio::test]
async fn late_handoff_branch_fires_on_pass() {
    // A pending path with no armed fence still routes the wake rather than
    // silently dropping the handoff.
    let (tracker, _dir) = tracker();
    tracker.set_pending_handoff("s1", PathBuf::from("/tmp/r.md"), None);

    let outcome = tracker.on_stop_signal("s1");
    assert!(matches!(outcome, StopSignalOutcome::Handoff { .. }));
}

// ---------------------------------------------------------------------------
// Stop-notify self-echo suppression
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stop_notify_is_one_shot() {
    let (tracker, _dir) = tracker();
    tracker.set_stop_notify("child", SessionId::new("parent"));

    assert_eq!(
        tracker.take_stop_notify("child"),
        Some(SessionId::new("parent"))
    );
    assert_eq!(tracker.take_stop_notify("child"), None);
}

#[tokio::test]
async fn stop_notify_suppressed_after_send_to_notifier() {
    let (tracker, _dir) = tracker();
    tracker.set_stop_notify("child", SessionId::new("parent"));
    // The child messaged the parent directly before stopping
    tracker.set_last_outgoing("child", SessionId::new("parent"));

    assert_eq!(tracker.take_stop_notify("child"), None);
}

// ---------------------------------------------------------------------------
// Transcript-read retries
// ---------------------------------------------------------------------------

fn assistant_line(text: &str) -> String {
    format!(
        r#"{{"type":"assistant","message":{{"content":[{{"type":"text","text":"{text}"}}]}}}}"#
    )
}

#[tokio::test]
async fn transcript_read_returns_latest_assistant_turn() {
    let (tracker, dir) = tracker();
    let path = dir.path().join("t.jsonl");
    let contents = format!(
        "{}\n{}\n{}\n",
        r#"{"type":"user","message":{"content":[{"type":"text","text":"hi"}]}}"#,
        assistant_line("first"),
        assistant_line("second"),
    );
    std::fs::write(&path, contents).unwrap();

    let response = tracker.read_stop_response("s1", &path).await;
    assert_eq!(response.as_deref(), Some("second"));
}

#[tokio::test]
async fn null_transcript_retries_once_then_proceeds_without_payload() {
    let (tracker, dir) = tracker();
    let path = dir.path().join("missing.jsonl");

    let started = std::time::Instant::now();
    let response = tracker.read_stop_response("s1", &path).await;
    let elapsed = started.elapsed();

    assert!(response.is_none());
    // Exactly one null retry (for_tests: 20ms), not two
    assert!(elapsed >= std::time::Duration::from_millis(20));
    assert!(elapsed < std::time::Duration::from_millis(200));
}

#[tokio::test]
async fn null_retry_can_pick_up_late_flush() {
    let (tracker, dir) = tracker();
    let path = dir.path().join("late.jsonl");

    let writer_path = path.clone();
    let writer = tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        std::fs::write(&writer_path, assistant_line("flushed late")).unwrap();
    });

    let response = tracker.read_stop_response("s1", &path).await;
    writer.await.unwrap();
    assert_eq!(response.as_deref(), Some("flushed late"));
}

#[tokio::test]
async fn stale_transcript_retries_once() {
    let (tracker, dir) = tracker();
    let path = dir.path().join("stale.jsonl");
    std::fs::write(&path, assistant_line("same answer")).unwrap();

    // First stop stores the response
    let first = tracker.read_stop_response("s1", &path).await;
    assert_eq!(first.as_deref(), Some("same answer"));

    // Second stop sees the same content: one stale retry, then no payload
    let second = tracker.read_stop_response("s1", &path).await;
    assert!(second.is_none());

    // If the retry window catches new content, it is returned
    let writer_path = path.clone();
    let writer = tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let mut contents = std::fs::read_to_string(&writer_path).unwrap();
        contents.push('\n');
        contents.push_str(&assistant_line("new answer"));
        std::fs::write(&writer_path, contents).unwrap();
    });
    let third = tracker.read_stop_response("s1", &path).await;
    writer.await.unwrap();
    assert_eq!(third.as_deref(), Some("new answer"));
}

#[tokio::test]
async fn remove_destroys_state() {
    let (tracker, _dir) = tracker();
    tracker.mark_idle("s1");
    assert!(tracker.is_idle("s1"));
    tracker.remove("s1");
    assert!(!tracker.is_idle("s1"));
}
