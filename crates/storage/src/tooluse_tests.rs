// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn entry(session: &str, tool: &str, at_ms: u64) -> ToolUseEntry {
    ToolUseEntry {
        session_id: session.to_string(),
        tool_name: tool.to_string(),
        detail: None,
        at_ms,
    }
}

#[test]
fn records_and_reads_newest_first() {
    let store = ToolUsageStore::open_in_memory().unwrap();
    for (i, tool) in ["Read", "Edit", "Bash", "Read", "Write", "Bash", "Edit"]
        .iter()
        .enumerate()
    {
        store.record(&entry("s1", tool, 100 + i as u64)).unwrap();
    }
    store.record(&entry("s2", "Glob", 50)).unwrap();

    let last = store.last_for("s1", 5).unwrap();
    assert_eq!(last.len(), 5);
    assert_eq!(last[0].tool_name, "Edit");
    assert_eq!(last[0].at_ms, 106);
    assert_eq!(last[4].tool_name, "Bash");
}

#[test]
fn detail_is_preserved() {
    let store = ToolUsageStore::open_in_memory().unwrap();
    store
        .record(&ToolUseEntry {
            session_id: "s1".to_string(),
            tool_name: "Bash".to_string(),
            detail: Some("cargo test".to_string()),
            at_ms: 7,
        })
        .unwrap();

    let last = store.last_for("s1", 1).unwrap();
    assert_eq!(last[0].detail.as_deref(), Some("cargo test"));
}

#[test]
fn purge_session_is_scoped() {
    let store = ToolUsageStore::open_in_memory().unwrap();
    store.record(&entry("s1", "Read", 1)).unwrap();
    store.record(&entry("s2", "Read", 2)).unwrap();

    assert_eq!(store.purge_session("s1").unwrap(), 1);
    assert!(store.last_for("s1", 5).unwrap().is_empty());
    assert_eq!(store.last_for("s2", 5).unwrap().len(), 1);
}
