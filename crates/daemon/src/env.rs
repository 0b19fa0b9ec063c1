// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon.

use std::path::PathBuf;

/// HTTP control plane port (default: 7321, loopback only).
pub fn http_port() -> u16 {
    std::env::var("SESH_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(7321)
}

/// State directory: `SESH_STATE_DIR` (tests), `$XDG_STATE_HOME/sesh`, or
/// `~/.local/state/sesh`.
pub fn state_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("SESH_STATE_DIR") {
        return Some(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Some(PathBuf::from(xdg).join("sesh"));
    }
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".local/state/sesh"))
}

/// Telegram bot token; the chat bridge is disabled without it.
pub fn telegram_token() -> Option<String> {
    std::env::var("SESH_TELEGRAM_TOKEN").ok().filter(|s| !s.is_empty())
}

/// Telegram chat id for operator traffic.
pub fn telegram_chat_id() -> Option<i64> {
    std::env::var("SESH_TELEGRAM_CHAT_ID")
        .ok()
        .and_then(|s| s.parse().ok())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
