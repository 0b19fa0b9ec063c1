// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use sesh_core::CONTEXT_MONITOR;
use tempfile::TempDir;

fn msg(target: &str, text: &str) -> NewMessage {
    NewMessage::to(target, text)
}

#[test]
fn enqueue_and_fetch_fifo() {
    let queue = MessageQueue::open_in_memory().unwrap();

    queue.enqueue(msg("t1", "first")).unwrap();
    queue.enqueue(msg("t1", "second")).unwrap();
    queue.enqueue(msg("t2", "other")).unwrap();

    let pending = queue.pending_for("t1").unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].text, "first");
    assert_eq!(pending[1].text, "second");

    let next = queue.next_pending("t1").unwrap().unwrap();
    assert_eq!(next.text, "first");
}

#[test]
fn fifo_is_stable_within_same_millisecond() {
    let queue = MessageQueue::open_in_memory().unwrap();
    // Enqueued fast enough that queued_at_ms ties; rowid breaks the tie
    for i in 0..20 {
        queue.enqueue(msg("t1", &format!("m{i}"))).unwrap();
    }
    let pending = queue.pending_for("t1").unwrap();
    let texts: Vec<_> = pending.iter().map(|m| m.text.as_str()).collect();
    let expected: Vec<String> = (0..20).map(|i| format!("m{i}")).collect();
    assert_eq!(texts, expected.iter().map(String::as_str).collect::<Vec<_>>());
}

#[test]
fn complete_removes_the_row() {
    let queue = MessageQueue::open_in_memory().unwrap();
    let stored = queue.enqueue(msg("t1", "once")).unwrap();

    queue.complete(&stored.id).unwrap();
    assert!(queue.next_pending("t1").unwrap().is_none());
    assert_eq!(queue.pending_count("t1").unwrap(), 0);
}

#[test]
fn cancel_context_monitor_spares_user_traffic() {
    let queue = MessageQueue::open_in_memory().unwrap();

    queue
        .enqueue(
            msg("em1", "context warning")
                .from_sender("aaaa1111")
                .category(CONTEXT_MONITOR),
        )
        .unwrap();
    queue
        .enqueue(msg("em1", "user message").from_sender("aaaa1111"))
        .unwrap();
    queue
        .enqueue(
            msg("em1", "other sender warning")
                .from_sender("bbbb2222")
                .category(CONTEXT_MONITOR),
        )
        .unwrap();

    let deleted = queue.cancel_context_monitor_from("aaaa1111").unwrap();
    assert_eq!(deleted, 1);

    let remaining = queue.pending_for("em1").unwrap();
    assert_eq!(remaining.len(), 2);
    assert!(remaining.iter().any(|m| m.text == "user message"));
    assert!(remaining.iter().any(|m| m.text == "other sender warning"));
}

#[test]
fn purge_target_drops_everything() {
    let queue = MessageQueue::open_in_memory().unwrap();
    queue.enqueue(msg("t1", "a")).unwrap();
    queue.enqueue(msg("t1", "b")).unwrap();
    queue.enqueue(msg("t2", "keep")).unwrap();

    assert_eq!(queue.purge_target("t1").unwrap(), 2);
    assert!(queue.pending_for("t1").unwrap().is_empty());
    assert_eq!(queue.pending_for("t2").unwrap().len(), 1);
}

#[test]
fn targets_with_pending_lists_distinct() {
    let queue = MessageQueue::open_in_memory().unwrap();
    queue.enqueue(msg("t1", "a")).unwrap();
    queue.enqueue(msg("t1", "b")).unwrap();
    queue.enqueue(msg("t2", "c")).unwrap();

    let mut targets = queue.targets_with_pending().unwrap();
    targets.sort();
    assert_eq!(targets, vec!["t1".to_string(), "t2".to_string()]);
}

#[test]
fn rows_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("queue.db");

    {
        let queue = MessageQueue::open(&path).unwrap();
        queue
            .enqueue(msg("t1", "durable").mode(DeliveryMode::Important))
            .unwrap();
    }

    let queue = MessageQueue::open(&path).unwrap();
    let pending = queue.pending_for("t1").unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].text, "durable");
    assert_eq!(pending[0].mode, DeliveryMode::Important);
}

#[test]
fn migration_is_idempotent_and_backfills_category() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("queue.db");

    // Simulate a database created before the category column existed
    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE message_queue (\
                id TEXT PRIMARY KEY,\
                target_id TEXT NOT NULL,\
                sender_id TEXT,\
                parent_id TEXT,\
                text TEXT NOT NULL,\
                mode TEXT NOT NULL,\
                queued_at_ms INTEGER NOT NULL,\
                delivered_at_ms INTEGER\
            );\
            INSERT INTO message_queue (id, target_id, text, mode, queued_at_ms) \
                VALUES ('m1', 't1', 'old row', 'sequential', 5);",
        )
        .unwrap();
    }

    // Opening runs the ALTER TABLE migration; opening twice must not fail
    let queue = MessageQueue::open(&path).unwrap();
    drop(queue);
    let queue = MessageQueue::open(&path).unwrap();

    let pending = queue.pending_for("t1").unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].text, "old row");
    assert!(pending[0].category.is_none());
}

#[test]
fn queued_message_fields_round_trip() {
    let queue = MessageQueue::open_in_memory().unwrap();
    let stored = queue
        .enqueue(
            NewMessage::to("t1", "full")
                .mode(DeliveryMode::Urgent)
                .from_sender("s1")
                .category(CONTEXT_MONITOR),
        )
        .unwrap();

    let fetched = queue.next_pending("t1").unwrap().unwrap();
    assert_eq!(fetched.id, stored.id);
    assert_eq!(fetched.mode, DeliveryMode::Urgent);
    assert_eq!(fetched.sender_id.as_ref().map(|s| s.as_str()), Some("s1"));
    assert_eq!(fetched.category.as_deref(), Some(CONTEXT_MONITOR));
    assert!(fetched.delivered_at_ms.is_none());
    assert_eq!(fetched.queued_at_ms, stored.queued_at_ms);
}
