// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use sesh_adapters::{FakeChatGateway, FakeTerminalAdapter};
use sesh_engine::runtime::SpawnSession;
use sesh_engine::{EngineConfig, RuntimeDeps, SessionRegistry};
use sesh_storage::{MessageQueue, ToolUsageStore};
use tempfile::TempDir;

const CHAT: i64 = -100500;

struct Fixture {
    bridge: Arc<ChatBridge<FakeTerminalAdapter, FakeChatGateway>>,
    gateway: FakeChatGateway,
    runtime: Arc<Runtime<FakeTerminalAdapter>>,
    dir: TempDir,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let runtime = Runtime::new(
        RuntimeDeps {
            terminal: FakeTerminalAdapter::new(),
            queue: Arc::new(MessageQueue::open_in_memory().unwrap()),
            tooluse: Arc::new(ToolUsageStore::open_in_memory().unwrap()),
            registry: Arc::new(
                SessionRegistry::open(dir.path().join("registry.json")).unwrap(),
            ),
        },
        EngineConfig::for_tests(dir.path()),
        None,
    );
    let gateway = FakeChatGateway::new();
    let bridge = Arc::new(ChatBridge::new(
        Arc::clone(&runtime),
        gateway.clone(),
        CHAT,
    ));
    Fixture {
        bridge,
        gateway,
        runtime,
        dir,
    }
}

async fn spawn(fixture: &Fixture, name: &str, is_em: bool) -> Session {
    fixture
        .runtime
        .create_session(SpawnSession {
            provider: sesh_core::Provider::ClaudeTmux,
            working_dir: fixture.dir.path().to_path_buf(),
            command: None,
            parent_id: None,
            friendly_name: name.to_string(),
            is_em,
            context_monitor_enabled: false,
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn first_em_creates_topic_and_stores_it() {
    let fixture = fixture();
    let em = spawn(&fixture, "em", true).await;

    fixture.bridge.bind_em_topic(&em).await;

    let topic = fixture.runtime.registry.em_topic().unwrap();
    assert_eq!(topic.chat_id, CHAT);
    let session = fixture.runtime.registry.get(em.id.as_str()).unwrap();
    assert_eq!(session.chat_thread_id, Some(topic.thread_id));
    assert_eq!(fixture.gateway.topics().len(), 1);
}

#[tokio::test]
async fn successor_em_inherits_topic() {
    let fixture = fixture();
    let first = spawn(&fixture, "em-1", true).await;
    fixture.bridge.bind_em_topic(&first).await;
    let inherited = fixture.runtime.registry.em_topic().unwrap();

    fixture.runtime.kill_session(first.id.as_str()).await.unwrap();

    let second = spawn(&fixture, "em-2", true).await;
    fixture.bridge.bind_em_topic(&second).await;

    // No second topic created; the thread is inherited
    assert_eq!(fixture.gateway.topics().len(), 1);
    assert_eq!(
        fixture
            .runtime
            .registry
            .get(second.id.as_str())
            .unwrap()
            .chat_thread_id,
        Some(inherited.thread_id)
    );
}

#[tokio::test]
async fn inbound_thread_message_routes_to_session() {
    let fixture = fixture();
    let session = spawn(&fixture, "worker", false).await;
    fixture.bridge.bind_session_topic(&session).await;
    let thread = fixture
        .runtime
        .registry
        .get(session.id.as_str())
        .unwrap()
        .chat_thread_id
        .unwrap();

    fixture
        .bridge
        .route_update(ChatUpdate {
            update_id: 1,
            chat_id: CHAT,
            thread_id: Some(thread),
            reply_to: None,
            text: "how is it going?".to_string(),
        })
        .await;

    let pending = fixture
        .runtime
        .delivery
        .queue()
        .pending_for(session.id.as_str())
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].text, "how is it going?");
}

#[tokio::test]
async fn inbound_plain_chat_routes_to_em() {
    let fixture = fixture();
    let em = spawn(&fixture, "em", true).await;

    fixture
        .bridge
        .route_update(ChatUpdate {
            update_id: 1,
            chat_id: CHAT,
            thread_id: None,
            reply_to: None,
            text: "status".to_string(),
        })
        .await;

    assert_eq!(
        fixture
            .runtime
            .delivery
            .queue()
            .pending_count(em.id.as_str())
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn inbound_from_other_chats_is_dropped() {
    let fixture = fixture();
    let em = spawn(&fixture, "em", true).await;

    fixture
        .bridge
        .route_update(ChatUpdate {
            update_id: 1,
            chat_id: CHAT + 1,
            thread_id: None,
            reply_to: None,
            text: "spoofed".to_string(),
        })
        .await;

    assert_eq!(
        fixture
            .runtime
            .delivery
            .queue()
            .pending_count(em.id.as_str())
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn outbound_notice_lands_in_session_thread() {
    let fixture = fixture();
    let session = spawn(&fixture, "worker", false).await;
    fixture.bridge.bind_session_topic(&session).await;
    let thread = fixture
        .runtime
        .registry
        .get(session.id.as_str())
        .unwrap()
        .chat_thread_id;

    let (tx, rx) = mpsc::channel(4);
    tx.send(Notice {
        session_id: session.id.as_str().to_string(),
        text: "worker is idle.".to_string(),
    })
    .await
    .unwrap();
    drop(tx);

    Arc::clone(&fixture.bridge).run_outbound(rx).await;

    let sent = fixture.gateway.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].chat_id, CHAT);
    assert_eq!(sent[0].thread_id, thread);
    assert_eq!(sent[0].text, "worker is idle.");
}
