// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use sesh_core::Provider;
use tempfile::TempDir;

fn registry() -> (SessionRegistry, TempDir) {
    let dir = TempDir::new().unwrap();
    let registry = SessionRegistry::open(dir.path().join("registry.json")).unwrap();
    (registry, dir)
}

fn params(name: &str) -> CreateSession {
    CreateSession {
        provider: Provider::ClaudeTmux,
        working_dir: "/tmp".into(),
        parent_id: None,
        friendly_name: name.to_string(),
        is_em: false,
        tmux_name: Some(format!("sesh-{name}")),
        context_monitor_enabled: false,
    }
}

#[test]
fn create_assigns_short_unique_ids() {
    let (registry, _dir) = registry();
    let a = registry.create(params("a"));
    let b = registry.create(params("b"));

    assert_eq!(a.id.as_str().len(), 8);
    assert_ne!(a.id, b.id);
    assert_eq!(a.status, SessionStatus::Running);
}

#[test]
fn resolve_by_id_prefix_and_name() {
    let (registry, _dir) = registry();
    let session = registry.create(params("builder"));
    let id = session.id.as_str();

    assert_eq!(registry.resolve(id).unwrap().id, session.id);
    assert_eq!(registry.resolve(&id[..4]).unwrap().id, session.id);
    assert_eq!(registry.resolve("builder").unwrap().id, session.id);

    assert!(matches!(
        registry.resolve("nope"),
        Err(EngineError::NotFound(_))
    ));
}

#[test]
fn resolve_rejects_ambiguous_prefix() {
    let (registry, _dir) = registry();
    // Create sessions until two share a first hex char (bounded, 17 tries
    // must produce a duplicate first char by pigeonhole)
    let mut first_chars = std::collections::HashMap::new();
    for i in 0..17 {
        let s = registry.create(params(&format!("s{i}")));
        let c = s.id.as_str().chars().next().unwrap();
        if let Some(_prev) = first_chars.insert(c, s.id.clone()) {
            let result = registry.resolve(&c.to_string());
            assert!(matches!(result, Err(EngineError::Ambiguous(_))));
            return;
        }
    }
    unreachable!("pigeonhole violated");
}

#[test]
fn stopped_is_terminal() {
    let (registry, _dir) = registry();
    let session = registry.create(params("x"));
    let id = session.id.as_str();

    registry.update_status(id, SessionStatus::Idle).unwrap();
    registry.mark_stopped(id);

    let err = registry.update_status(id, SessionStatus::Running);
    assert!(matches!(err, Err(EngineError::InvalidState(_))));
    assert_eq!(registry.get(id).unwrap().status, SessionStatus::Stopped);

    // mark_stopped stays idempotent
    registry.mark_stopped(id);
    assert_eq!(registry.get(id).unwrap().status, SessionStatus::Stopped);
}

#[test]
fn write_through_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("registry.json");

    let id = {
        let registry = SessionRegistry::open(path.clone()).unwrap();
        let session = registry.create(params("persist"));
        registry.set_em_topic(Some(EmTopic {
            chat_id: 9,
            thread_id: 3,
        }));
        registry
            .update_status(session.id.as_str(), SessionStatus::Idle)
            .unwrap();
        session.id
    };

    let registry = SessionRegistry::open(path).unwrap();
    let restored = registry.get(id.as_str()).unwrap();
    assert_eq!(restored.status, SessionStatus::Idle);
    assert_eq!(restored.friendly_name, "persist");
    assert_eq!(
        registry.em_topic(),
        Some(EmTopic {
            chat_id: 9,
            thread_id: 3
        })
    );
}

#[test]
fn em_session_ignores_stopped() {
    let (registry, _dir) = registry();
    let mut p = params("em");
    p.is_em = true;
    let em = registry.create(p);

    assert_eq!(registry.em_session().unwrap().id, em.id);
    registry.mark_stopped(em.id.as_str());
    assert!(registry.em_session().is_none());
}

#[test]
fn telemetry_setters_update_record() {
    let (registry, _dir) = registry();
    let session = registry.create(params("t"));
    let id = session.id.as_str();

    registry.record_tool_call(id, "Bash");
    registry.set_agent_status(id, "compiling");
    registry.set_tokens(id, 1000, 200_000);

    let s = registry.get(id).unwrap();
    assert_eq!(s.last_tool_name.as_deref(), Some("Bash"));
    assert!(s.last_tool_call_ms.is_some());
    assert_eq!(s.agent_status.as_deref(), Some("compiling"));
    assert_eq!(s.tokens_used, 1000);
    assert_eq!(s.context_window, 200_000);
}

#[test]
fn find_by_transcript_matches_id_in_path() {
    let (registry, _dir) = registry();
    let session = registry.create(params("t"));
    let path = format!("/home/u/.claude/projects/x/{}.jsonl", session.id);

    assert_eq!(
        registry.find_by_transcript(&path).unwrap().id,
        session.id
    );
    assert!(registry.find_by_transcript("/tmp/unrelated.jsonl").is_none());
}

#[test]
fn remove_deletes_record() {
    let (registry, _dir) = registry();
    let session = registry.create(params("gone"));
    assert!(registry.remove(session.id.as_str()).is_some());
    assert!(registry.get(session.id.as_str()).is_none());
    assert!(registry.remove(session.id.as_str()).is_none());
}
