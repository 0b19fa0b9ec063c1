// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tmux terminal adapter
//!
//! Every operation shells out to the `tmux` binary; there is no persistent
//! control connection. Panes are detached sessions named `sesh-<name>` so
//! an operator can attach to any of them by hand.

use super::{TerminalAdapter, TerminalError};
use async_trait::async_trait;
use std::path::Path;
use std::process::Output;
use tokio::process::Command;

/// Tmux-based terminal adapter
#[derive(Clone, Default)]
pub struct TmuxAdapter;

impl TmuxAdapter {
    pub fn new() -> Self {
        Self
    }
}

/// Run one tmux command and hand back its raw output.
async fn tmux(args: &[&str]) -> Result<Output, TerminalError> {
    Command::new("tmux")
        .args(args)
        .output()
        .await
        .map_err(|e| TerminalError::CommandFailed(e.to_string()))
}

/// Run a tmux command where a non-zero exit means the pane is gone.
async fn tmux_on_pane(pane: &str, args: &[&str]) -> Result<Output, TerminalError> {
    let output = tmux(args).await?;
    if !output.status.success() {
        return Err(TerminalError::NotFound(pane.to_string()));
    }
    Ok(output)
}

#[async_trait]
impl TerminalAdapter for TmuxAdapter {
    async fn spawn(
        &self,
        name: &str,
        cwd: &Path,
        cmd: &str,
        env: &[(String, String)],
    ) -> Result<String, TerminalError> {
        // With a bad -c directory tmux still exits 0 and the agent command
        // dies instantly inside the pane; validate up front instead.
        if !cwd.exists() {
            return Err(TerminalError::SpawnFailed(format!(
                "working directory does not exist: {}",
                cwd.display()
            )));
        }

        let pane_id = format!("sesh-{}", name);

        // A leftover session under this name would make new-session fail
        let stale = tmux(&["has-session", "-t", &pane_id]).await;
        if stale.map(|o| o.status.success()).unwrap_or(false) {
            tracing::warn!(pane_id, "stale pane under this name, killing it");
            let _ = tmux(&["kill-session", "-t", &pane_id]).await;
        }

        let mut spawn_cmd = Command::new("tmux");
        spawn_cmd
            .args(["new-session", "-d", "-s", &pane_id, "-c"])
            .arg(cwd);
        for (key, value) in env {
            spawn_cmd.arg("-e").arg(format!("{}={}", key, value));
        }
        spawn_cmd.arg(cmd);

        let output = spawn_cmd
            .output()
            .await
            .map_err(|e| TerminalError::SpawnFailed(e.to_string()))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            tracing::error!(pane_id, stderr = %stderr, "tmux spawn failed");
            return Err(TerminalError::SpawnFailed(stderr.to_string()));
        }
        if !stderr.is_empty() {
            // Server startup chatter and config warnings land here
            tracing::warn!(pane_id, stderr = %stderr, "tmux spawn stderr (non-fatal)");
        }

        Ok(pane_id)
    }

    async fn send_literal_text(&self, pane: &str, text: &str) -> Result<(), TerminalError> {
        // Literal mode: tmux must not turn the text into key names, and the
        // option terminator keeps a leading dash from being parsed as a flag
        tmux_on_pane(pane, &["send-keys", "-t", pane, "-l", "--", text]).await?;
        Ok(())
    }

    async fn send_submit_key(&self, pane: &str) -> Result<(), TerminalError> {
        self.send_key(pane, "Enter").await
    }

    async fn send_cancel_key(&self, pane: &str) -> Result<(), TerminalError> {
        self.send_key(pane, "Escape").await
    }

    async fn send_key(&self, pane: &str, key: &str) -> Result<(), TerminalError> {
        tmux_on_pane(pane, &["send-keys", "-t", pane, key]).await?;
        Ok(())
    }

    async fn capture_pane(&self, pane: &str, from_start: bool) -> Result<String, TerminalError> {
        let output = if from_start {
            // -S - reaches back through the whole history limit
            tmux_on_pane(pane, &["capture-pane", "-t", pane, "-p", "-S", "-"]).await?
        } else {
            tmux_on_pane(pane, &["capture-pane", "-t", pane, "-p"]).await?
        };
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn capture_last(&self, pane: &str, lines: u32) -> Result<String, TerminalError> {
        let offset = format!("-{}", lines);
        let output =
            tmux_on_pane(pane, &["capture-pane", "-t", pane, "-p", "-S", &offset]).await?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn kill(&self, pane: &str) -> Result<(), TerminalError> {
        // An already-dead pane fails the kill; that is the desired end state
        let _ = tmux(&["kill-session", "-t", pane]).await?;
        Ok(())
    }

    async fn exists(&self, pane: &str) -> Result<bool, TerminalError> {
        let output = tmux(&["has-session", "-t", pane]).await?;
        Ok(output.status.success())
    }

    async fn pipe_log(&self, pane: &str, path: &Path) -> Result<(), TerminalError> {
        if let Some(parent) = path.parent() {
            let _ = tokio::fs::create_dir_all(parent).await;
        }
        let sink = format!("cat >> {}", shell_quote(&path.display().to_string()));
        let output = tmux(&["pipe-pane", "-o", "-t", pane, &sink]).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(pane, stderr = %stderr, "tmux pipe-pane failed (non-fatal)");
        }
        Ok(())
    }
}

/// Quote a path for the pipe-pane shell command.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

#[cfg(test)]
#[path = "tmux_tests.rs"]
mod tests;
