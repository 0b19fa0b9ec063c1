// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal driver adapters (tmux)

mod name;
mod tmux;

pub use name::generate_pane_name;
pub use tmux::TmuxAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeTerminalAdapter, TerminalCall};

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Errors from terminal driver operations
#[derive(Debug, Error)]
pub enum TerminalError {
    #[error("pane not found: {0}")]
    NotFound(String),
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("command failed: {0}")]
    CommandFailed(String),
}

/// Adapter for driving terminal panes.
///
/// Literal text and the submit key are deliberately separate calls: the
/// message injection contract requires a settle delay between them, owned
/// by the caller. A combined text+return injection trips the agent's
/// paste-detection heuristic and the return never submits.
#[async_trait]
pub trait TerminalAdapter: Clone + Send + Sync + 'static {
    /// Spawn a new pane running `cmd`; returns the pane identifier.
    async fn spawn(
        &self,
        name: &str,
        cwd: &Path,
        cmd: &str,
        env: &[(String, String)],
    ) -> Result<String, TerminalError>;

    /// Send literal text (no key-name interpretation, no submit).
    async fn send_literal_text(&self, pane: &str, text: &str) -> Result<(), TerminalError>;

    /// Send the submit (Enter) key.
    async fn send_submit_key(&self, pane: &str) -> Result<(), TerminalError>;

    /// Send the cancel (Escape) key.
    async fn send_cancel_key(&self, pane: &str) -> Result<(), TerminalError>;

    /// Send a named key (e.g. "Tab", "C-c").
    async fn send_key(&self, pane: &str, key: &str) -> Result<(), TerminalError>;

    /// Capture pane contents. With `from_start`, includes the full
    /// scrollback (best-effort; bounded by the pane's history limit).
    async fn capture_pane(&self, pane: &str, from_start: bool) -> Result<String, TerminalError>;

    /// Capture the last `lines` lines of the pane.
    async fn capture_last(&self, pane: &str, lines: u32) -> Result<String, TerminalError>;

    /// Kill the pane.
    async fn kill(&self, pane: &str) -> Result<(), TerminalError>;

    /// Check if the pane exists.
    async fn exists(&self, pane: &str) -> Result<bool, TerminalError>;

    /// Mirror pane output to a log file for the session's lifetime.
    async fn pipe_log(&self, pane: &str, path: &Path) -> Result<(), TerminalError>;
}
