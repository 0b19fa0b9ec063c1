// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, recovery.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use fs2::FileExt;
use sesh_adapters::TmuxAdapter;
use sesh_engine::{EngineConfig, Notice, Runtime, RuntimeDeps, SessionRegistry};
use sesh_storage::{MessageQueue, ToolUsageStore};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::info;

/// Daemon runtime with the concrete terminal adapter.
pub type DaemonRuntime = Runtime<TmuxAdapter>;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/sesh)
    pub state_dir: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to the file recording the bound HTTP port
    pub port_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Path to registry snapshot file
    pub snapshot_path: PathBuf,
    /// Path to the message queue database
    pub queue_path: PathBuf,
    /// Path to the tool-usage database
    pub tooluse_path: PathBuf,
}

impl Config {
    /// Load configuration for the user-level daemon.
    ///
    /// Uses fixed paths under `~/.local/state/sesh/` (or
    /// `$XDG_STATE_HOME/sesh/`). One daemon serves all sessions for a user.
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = crate::env::state_dir().ok_or(LifecycleError::NoStateDir)?;
        Ok(Self {
            lock_path: state_dir.join("daemon.pid"),
            port_path: state_dir.join("daemon.port"),
            log_path: state_dir.join("daemon.log"),
            snapshot_path: state_dir.join("registry.json"),
            queue_path: state_dir.join("queue.db"),
            tooluse_path: state_dir.join("tooluse.db"),
            state_dir,
        })
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Engine error: {0}")]
    Engine(#[from] sesh_engine::EngineError),

    #[error("Queue error: {0}")]
    Queue(#[from] sesh_storage::QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Daemon state during operation.
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub runtime: Arc<DaemonRuntime>,
    /// Operator notices emitted by the engine, drained by the chat bridge
    pub notice_rx: mpsc::Receiver<Notice>,
}

/// Start the daemon: lock, open stores, recover state.
pub async fn startup(config: &Config) -> Result<DaemonState, LifecycleError> {
    match startup_inner(config).await {
        Ok(state) => Ok(state),
        Err(e) => {
            // A lock failure means another daemon owns the pid/port files;
            // only clean up after failures past the lock.
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

async fn startup_inner(config: &Config) -> Result<DaemonState, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;

    // Take the exclusive lock before anything else. Opened without
    // truncation: until the lock is held, the file's contents are the
    // running daemon's PID and must stay readable.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    // Lock held: the file is ours now, replace its contents with our PID
    use std::io::Write;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    // Open durable state: snapshot-backed registry and the SQLite stores
    let registry = Arc::new(SessionRegistry::open(config.snapshot_path.clone())?);
    let queue = Arc::new(MessageQueue::open(&config.queue_path)?);
    let tooluse = Arc::new(ToolUsageStore::open(&config.tooluse_path)?);

    let (notice_tx, notice_rx) = mpsc::channel(128);

    let runtime = Runtime::new(
        RuntimeDeps {
            terminal: TmuxAdapter::new(),
            queue,
            tooluse,
            registry,
        },
        EngineConfig::from_env(),
        Some(notice_tx),
    );

    // Crash recovery: dead panes become STOPPED, orphaned queue rows are
    // discarded, surviving undelivered rows wait for the next idle signal.
    runtime.recover().await?;

    info!("Daemon started");

    Ok(DaemonState {
        config: config.clone(),
        lock_file,
        runtime,
        notice_rx,
    })
}

impl DaemonState {
    /// Shutdown the daemon gracefully.
    ///
    /// Sessions (tmux panes) are intentionally preserved across daemon
    /// restarts so that long-running agents continue working; the next
    /// startup reconciles against surviving panes.
    pub fn shutdown(&mut self) {
        info!("Shutting down daemon...");

        if self.config.port_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.port_path) {
                tracing::warn!("Failed to remove port file: {}", e);
            }
        }
        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                tracing::warn!("Failed to remove PID file: {}", e);
            }
        }
        // Lock released when self.lock_file drops

        info!("Daemon shutdown complete");
    }
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    if config.port_path.exists() {
        let _ = std::fs::remove_file(&config.port_path);
    }
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
