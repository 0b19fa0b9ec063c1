// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hook event payloads.
//!
//! Agents call back into the daemon over HTTP on tool use, stop,
//! notification, and context events. Payloads are JSON with a loose shape;
//! unknown fields are ignored and a missing session id falls back to
//! transcript-path matching.

use serde::{Deserialize, Serialize};

/// Recognized hook event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HookEventKind {
    PreToolUse,
    PostToolUse,
    Stop,
    /// Notification hook with an idle_prompt payload
    Notification,
    ContextUsage,
    Compaction,
    CompactionComplete,
    ContextReset,
    SessionStart,
}

impl std::str::FromStr for HookEventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PreToolUse" => Ok(HookEventKind::PreToolUse),
            "PostToolUse" => Ok(HookEventKind::PostToolUse),
            "Stop" => Ok(HookEventKind::Stop),
            "Notification" | "idle_prompt" => Ok(HookEventKind::Notification),
            "context_usage" => Ok(HookEventKind::ContextUsage),
            "compaction" => Ok(HookEventKind::Compaction),
            "compaction_complete" => Ok(HookEventKind::CompactionComplete),
            "context_reset" => Ok(HookEventKind::ContextReset),
            "SessionStart" => Ok(HookEventKind::SessionStart),
            other => Err(format!("unknown hook event: {}", other)),
        }
    }
}

/// Raw hook payload as decoded from the HTTP sink.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookPayload {
    pub event: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub transcript_path: Option<String>,
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub target_file: Option<String>,
    #[serde(default)]
    pub bash_command: Option<String>,
    /// Tokens in use, for context_usage events
    #[serde(default)]
    pub tokens_used: Option<u64>,
    /// Context window size, for context_usage events
    #[serde(default)]
    pub context_window: Option<u64>,
}

impl HookPayload {
    /// Parse the event kind; `None` for unrecognized events.
    pub fn kind(&self) -> Option<HookEventKind> {
        self.event.parse().ok()
    }

    /// One-line tool detail for the observability store.
    pub fn tool_detail(&self) -> Option<String> {
        self.bash_command
            .clone()
            .or_else(|| self.target_file.clone())
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
