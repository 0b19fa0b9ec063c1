// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::path::PathBuf;
use yare::parameterized;

fn sample_session() -> Session {
    Session {
        id: SessionId::new("ab12cd34"),
        provider: Provider::ClaudeTmux,
        tmux_name: Some("sesh-ab12cd34".to_string()),
        parent_id: None,
        working_dir: PathBuf::from("/tmp/project"),
        created_at_ms: 1_000,
        friendly_name: String::new(),
        status: SessionStatus::Running,
        last_activity_ms: 0,
        last_tool_call_ms: None,
        last_tool_name: None,
        is_em: false,
        chat_thread_id: None,
        tokens_used: 0,
        context_window: 0,
        context_monitor_enabled: false,
        agent_status: None,
        agent_status_at_ms: None,
        is_compacting: false,
        context_warning_sent: false,
        context_critical_sent: false,
    }
}

#[parameterized(
    claude = { "claude_tmux", Provider::ClaudeTmux },
    codex = { "codex_tmux", Provider::CodexTmux },
    app = { "codex_app", Provider::CodexApp },
)]
fn provider_round_trips_through_str(s: &str, expected: Provider) {
    let parsed: Provider = s.parse().unwrap();
    assert_eq!(parsed, expected);
    assert_eq!(parsed.to_string(), s);
}

#[test]
fn provider_capabilities() {
    assert_eq!(Provider::ClaudeTmux.prompt_glyph(), Some(">"));
    assert_eq!(Provider::CodexTmux.prompt_glyph(), Some("›"));
    assert_eq!(Provider::CodexApp.prompt_glyph(), None);

    assert!(Provider::ClaudeTmux.has_hooks());
    assert!(!Provider::CodexTmux.has_hooks());
    assert!(!Provider::CodexApp.has_pane());
}

#[test]
fn runtime_flags_are_not_serialized() {
    let mut session = sample_session();
    session.is_compacting = true;
    session.context_warning_sent = true;

    let json = serde_json::to_string(&session).unwrap();
    assert!(!json.contains("is_compacting"));
    assert!(!json.contains("context_warning_sent"));

    let restored: Session = serde_json::from_str(&json).unwrap();
    assert!(!restored.is_compacting);
    assert!(!restored.context_warning_sent);
}

#[test]
fn deserializes_with_missing_optional_fields() {
    // A minimal snapshot written by an older version
    let json = r#"{
        "id": "ab12cd34",
        "provider": "claude_tmux",
        "working_dir": "/tmp/p",
        "created_at_ms": 5,
        "status": "idle"
    }"#;
    let session: Session = serde_json::from_str(json).unwrap();
    assert_eq!(session.status, SessionStatus::Idle);
    assert!(session.tmux_name.is_none());
    assert!(!session.is_em);
    assert_eq!(session.tokens_used, 0);
}

#[test]
fn display_name_falls_back_to_id() {
    let mut session = sample_session();
    assert_eq!(session.display_name(), "ab12cd34");
    session.friendly_name = "builder".to_string();
    assert_eq!(session.display_name(), "builder");
}
