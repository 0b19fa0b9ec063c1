// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;
use tempfile::TempDir;

fn test_config(dir: &TempDir) -> Config {
    let state_dir = dir.path().to_path_buf();
    Config {
        lock_path: state_dir.join("daemon.pid"),
        port_path: state_dir.join("daemon.port"),
        log_path: state_dir.join("daemon.log"),
        snapshot_path: state_dir.join("registry.json"),
        queue_path: state_dir.join("queue.db"),
        tooluse_path: state_dir.join("tooluse.db"),
        state_dir,
    }
}

#[tokio::test]
#[serial(lifecycle)]
async fn startup_acquires_lock_and_writes_pid() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    let daemon = startup(&config).await.unwrap();

    let pid = std::fs::read_to_string(&config.lock_path).unwrap();
    assert_eq!(pid.trim(), std::process::id().to_string());

    // Stores created
    assert!(config.queue_path.exists());
    assert!(config.tooluse_path.exists());

    drop(daemon);
}

#[tokio::test]
#[serial(lifecycle)]
async fn second_startup_fails_on_lock() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    let _first = startup(&config).await.unwrap();
    let second = startup(&config).await;
    assert!(matches!(second, Err(LifecycleError::LockFailed(_))));

    // The running daemon's PID file must survive the failed attempt
    assert!(config.lock_path.exists());
}

#[tokio::test]
#[serial(lifecycle)]
async fn shutdown_removes_runtime_files() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    let mut daemon = startup(&config).await.unwrap();
    std::fs::write(&config.port_path, "7321\n").unwrap();

    daemon.shutdown();
    assert!(!config.lock_path.exists());
    assert!(!config.port_path.exists());
}

#[tokio::test]
#[serial(lifecycle)]
async fn startup_recovers_registry_and_queue() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    // First run: create a session record pointing at a pane that will not
    // exist, plus a queued message for it.
    {
        let daemon = startup(&config).await.unwrap();
        let registry = &daemon.runtime.registry;
        let session = registry.create(sesh_engine::CreateSession {
            provider: sesh_core::Provider::ClaudeTmux,
            working_dir: "/tmp".into(),
            parent_id: None,
            friendly_name: "ghost".to_string(),
            is_em: false,
            tmux_name: Some("sesh-definitely-not-running".to_string()),
            context_monitor_enabled: false,
        });
        daemon
            .runtime
            .delivery
            .queue()
            .enqueue(sesh_core::NewMessage::to(session.id.as_str(), "orphan"))
            .unwrap();
        // Drop without shutdown: simulates a crash (lock released on drop)
    }

    // Second run reconciles: pane gone → stopped, orphan row discarded
    let daemon = startup(&config).await.unwrap();
    let sessions = daemon.runtime.registry.list();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].status, sesh_core::SessionStatus::Stopped);
    assert_eq!(
        daemon
            .runtime
            .delivery
            .queue()
            .pending_count(sessions[0].id.as_str())
            .unwrap(),
        0
    );
}
