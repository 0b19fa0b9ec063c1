// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine tuning knobs.
//!
//! Defaults are the production values; tests construct small ones directly.
//! `from_env` applies `SESH_*` overrides on top of the defaults.

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Delay between literal text and the submit key. The two-phase
    /// injection contract requires at least 300ms here; shorter values trip
    /// the agent's paste-detection heuristic.
    pub settle: Duration,
    /// Interval between prompt-signature polls on the urgent path
    pub urgent_poll_interval: Duration,
    /// Total budget for urgent prompt polling
    pub urgent_poll_budget: Duration,
    /// Skip-fence TTL: hook transport timeout plus margin
    pub fence_ttl: Duration,
    /// Watcher poll interval
    pub watch_poll: Duration,
    /// Reminder poll interval
    pub remind_poll: Duration,
    /// Ceiling on waiting out a compaction before delivering a reminder anyway
    pub compaction_wait_ceiling: Duration,
    /// Retry delay when the transcript has not been flushed yet
    pub transcript_null_retry: Duration,
    /// Retry delay when the transcript still shows the previous response
    pub transcript_stale_retry: Duration,
    /// Root for handoff artifacts (`<data_dir>/handoffs/<id>-<ts>/dump.txt`)
    pub data_dir: PathBuf,
    /// Directory of always-on pane pipe-logs
    pub pipe_log_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(300),
            urgent_poll_interval: Duration::from_millis(200),
            urgent_poll_budget: Duration::from_secs(3),
            fence_ttl: Duration::from_secs(8),
            watch_poll: Duration::from_secs(2),
            remind_poll: Duration::from_secs(1),
            compaction_wait_ceiling: Duration::from_secs(300),
            transcript_null_retry: Duration::from_millis(500),
            transcript_stale_retry: Duration::from_millis(300),
            data_dir: default_data_dir(),
            pipe_log_dir: PathBuf::from("/tmp/sesh-sessions"),
        }
    }
}

impl EngineConfig {
    /// Production config with `SESH_*` environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(ms) = env_ms("SESH_SETTLE_MS") {
            config.settle = ms;
        }
        if let Some(ms) = env_ms("SESH_FENCE_TTL_MS") {
            config.fence_ttl = ms;
        }
        if let Some(ms) = env_ms("SESH_URGENT_POLL_BUDGET_MS") {
            config.urgent_poll_budget = ms;
        }
        if let Some(ms) = env_ms("SESH_WATCH_POLL_MS") {
            config.watch_poll = ms;
        }
        if let Some(ms) = env_ms("SESH_REMIND_POLL_MS") {
            config.remind_poll = ms;
        }
        config
    }

    /// Fast config for tests: real delays shrunk to milliseconds.
    #[doc(hidden)]
    pub fn for_tests(dir: &std::path::Path) -> Self {
        Self {
            settle: Duration::from_millis(20),
            urgent_poll_interval: Duration::from_millis(5),
            urgent_poll_budget: Duration::from_millis(100),
            fence_ttl: Duration::from_millis(200),
            watch_poll: Duration::from_millis(10),
            remind_poll: Duration::from_millis(10),
            compaction_wait_ceiling: Duration::from_millis(100),
            transcript_null_retry: Duration::from_millis(20),
            transcript_stale_retry: Duration::from_millis(10),
            data_dir: dir.join("data"),
            pipe_log_dir: dir.join("pipes"),
        }
    }
}

fn env_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

fn default_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(dir).join("sesh");
    }
    match std::env::var("HOME") {
        Ok(home) => PathBuf::from(home).join(".local/share/sesh"),
        Err(_) => PathBuf::from("/tmp/sesh-data"),
    }
}
