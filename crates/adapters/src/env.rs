// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the adapters crate.

use std::time::Duration;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Bound for a single remote-chat long poll (default: 15000ms).
///
/// Kept shorter than the transport's own default so a silently stalled
/// connection surfaces as a poll error instead of hanging.
pub fn chat_poll_timeout() -> Duration {
    parse_duration_ms("SESH_CHAT_POLL_TIMEOUT_MS").unwrap_or(Duration::from_secs(15))
}

/// Health-monitor threshold for the chat poll loop (default: 45000ms).
pub fn chat_health_threshold() -> Duration {
    parse_duration_ms("SESH_CHAT_HEALTH_MS").unwrap_or(Duration::from_secs(45))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
