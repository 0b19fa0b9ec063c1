// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session records for the registry.
//!
//! A Session is one live agent: a Claude Code or Codex CLI process inside a
//! tmux pane, or a headless Codex app-server session. The registry owns the
//! authoritative table of these records and snapshots them to disk.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

crate::define_id! {
    /// Unique identifier for an agent session (8 hex chars).
    pub struct SessionId;
}

impl Default for SessionId {
    fn default() -> Self {
        SessionId(String::new())
    }
}

/// Which agent runtime backs a session.
///
/// The provider determines which idle signals are available: claude_tmux
/// has stop hooks and prompt inspection, codex_tmux has prompt inspection
/// only, codex_app reports turn completion over RPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    ClaudeTmux,
    CodexTmux,
    CodexApp,
}

impl Provider {
    /// The prompt glyph that marks an idle composer for pane-based providers.
    pub fn prompt_glyph(&self) -> Option<&'static str> {
        match self {
            Provider::ClaudeTmux => Some(">"),
            Provider::CodexTmux => Some("›"),
            Provider::CodexApp => None,
        }
    }

    /// Whether the provider runs inside a tmux pane.
    pub fn has_pane(&self) -> bool {
        !matches!(self, Provider::CodexApp)
    }

    /// Whether the provider fires stop hooks.
    pub fn has_hooks(&self) -> bool {
        matches!(self, Provider::ClaudeTmux)
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::ClaudeTmux => write!(f, "claude_tmux"),
            Provider::CodexTmux => write!(f, "codex_tmux"),
            Provider::CodexApp => write!(f, "codex_app"),
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "claude_tmux" => Ok(Provider::ClaudeTmux),
            "codex_tmux" => Ok(Provider::CodexTmux),
            "codex_app" => Ok(Provider::CodexApp),
            other => Err(format!("unknown provider: {}", other)),
        }
    }
}

/// Externally visible session status.
///
/// STOPPED is terminal: no transitions back out of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Running,
    Idle,
    Stopped,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Running => write!(f, "running"),
            SessionStatus::Idle => write!(f, "idle"),
            SessionStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// The external-chat forum thread inherited between successive EM sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmTopic {
    pub chat_id: i64,
    pub thread_id: i64,
}

/// Session record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub provider: Provider,
    /// tmux pane identifier; absent for codex_app
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmux_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<SessionId>,
    pub working_dir: PathBuf,
    pub created_at_ms: u64,
    #[serde(default)]
    pub friendly_name: String,
    pub status: SessionStatus,
    #[serde(default)]
    pub last_activity_ms: u64,
    #[serde(default)]
    pub last_tool_call_ms: Option<u64>,
    #[serde(default)]
    pub last_tool_name: Option<String>,
    /// EM sessions inherit the prior EM's external-chat topic
    #[serde(default)]
    pub is_em: bool,
    /// Forum thread bound to this session, if the chat gateway is active
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_thread_id: Option<i64>,
    #[serde(default)]
    pub tokens_used: u64,
    #[serde(default)]
    pub context_window: u64,
    #[serde(default)]
    pub context_monitor_enabled: bool,
    /// Latest free-form status reported by the agent itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_status: Option<String>,
    #[serde(default)]
    pub agent_status_at_ms: Option<u64>,
    // Runtime-only flags, never persisted.
    #[serde(skip)]
    pub is_compacting: bool,
    #[serde(skip)]
    pub context_warning_sent: bool,
    #[serde(skip)]
    pub context_critical_sent: bool,
}

impl Session {
    pub fn is_stopped(&self) -> bool {
        self.status == SessionStatus::Stopped
    }

    /// Display name: friendly name when set, otherwise the id.
    pub fn display_name(&self) -> &str {
        if self.friendly_name.is_empty() {
            self.id.as_str()
        } else {
            &self.friendly_name
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
