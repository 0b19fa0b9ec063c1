// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests.
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::config::EngineConfig;
use crate::registry::SessionRegistry;
use crate::runtime::{Runtime, RuntimeDeps, SpawnSession};
use sesh_adapters::FakeTerminalAdapter;
use sesh_core::{Provider, Session};
use sesh_storage::{MessageQueue, ToolUsageStore};
use std::sync::Arc;
use tempfile::TempDir;

pub(crate) struct TestRuntime {
    pub runtime: Arc<Runtime<FakeTerminalAdapter>>,
    pub terminal: FakeTerminalAdapter,
    pub dir: TempDir,
}

pub(crate) fn test_runtime() -> TestRuntime {
    let dir = TempDir::new().unwrap();
    let config = EngineConfig::for_tests(dir.path());

    let terminal = FakeTerminalAdapter::new();
    let queue = Arc::new(MessageQueue::open_in_memory().unwrap());
    let tooluse = Arc::new(ToolUsageStore::open_in_memory().unwrap());
    let registry =
        Arc::new(SessionRegistry::open(dir.path().join("registry.json")).unwrap());

    let runtime = Runtime::new(
        RuntimeDeps {
            terminal: terminal.clone(),
            queue,
            tooluse,
            registry,
        },
        config,
        None,
    );

    TestRuntime {
        runtime,
        terminal,
        dir,
    }
}

impl TestRuntime {
    pub(crate) async fn spawn(&self, provider: Provider, name: &str) -> Session {
        self.runtime
            .create_session(SpawnSession {
                provider,
                working_dir: self.dir.path().to_path_buf(),
                command: None,
                parent_id: None,
                friendly_name: name.to_string(),
                is_em: false,
                context_monitor_enabled: false,
            })
            .await
            .unwrap()
    }

    pub(crate) async fn spawn_claude(&self, name: &str) -> Session {
        self.spawn(Provider::ClaudeTmux, name).await
    }

    /// Pane id of a spawned session.
    pub(crate) fn pane(&self, session: &Session) -> String {
        session.tmux_name.clone().unwrap()
    }

    /// Wait until `cond` holds, or panic after ~2s.
    pub(crate) async fn wait_until(&self, what: &str, mut cond: impl FnMut() -> bool) {
        for _ in 0..200 {
            if cond() {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("timed out waiting for: {what}");
    }
}
