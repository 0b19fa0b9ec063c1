// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake terminal adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{TerminalAdapter, TerminalError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Recorded terminal call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalCall {
    Spawn { name: String, cmd: String },
    SendLiteralText { pane: String, text: String },
    SendSubmitKey { pane: String },
    SendCancelKey { pane: String },
    SendKey { pane: String, key: String },
    CapturePane { pane: String, from_start: bool },
    CaptureLast { pane: String, lines: u32 },
    Kill { pane: String },
    Exists { pane: String },
    PipeLog { pane: String, path: PathBuf },
}

#[derive(Debug, Clone, Default)]
struct FakePane {
    alive: bool,
    capture: String,
}

#[derive(Default)]
struct FakeTerminalState {
    panes: HashMap<String, FakePane>,
    calls: Vec<(TerminalCall, Instant)>,
    fail_literal_once: bool,
    fail_submit_once: bool,
    fail_capture_once: bool,
}

/// Fake terminal adapter recording every call with a timestamp, so tests
/// can assert both ordering and the settle gap between text and submit.
#[derive(Clone, Default)]
pub struct FakeTerminalAdapter {
    inner: Arc<Mutex<FakeTerminalState>>,
}

impl FakeTerminalAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pane directly (bypasses spawn).
    pub fn add_pane(&self, pane: &str) {
        self.inner.lock().panes.insert(
            pane.to_string(),
            FakePane {
                alive: true,
                capture: String::new(),
            },
        );
    }

    /// Script the pane contents returned by capture calls.
    pub fn set_capture(&self, pane: &str, contents: &str) {
        if let Some(p) = self.inner.lock().panes.get_mut(pane) {
            p.capture = contents.to_string();
        }
    }

    /// Mark a pane dead (exists() returns false, sends fail).
    pub fn set_dead(&self, pane: &str) {
        if let Some(p) = self.inner.lock().panes.get_mut(pane) {
            p.alive = false;
        }
    }

    /// Make the next send_literal_text call fail.
    pub fn fail_next_literal(&self) {
        self.inner.lock().fail_literal_once = true;
    }

    /// Make the next send_submit_key call fail.
    pub fn fail_next_submit(&self) {
        self.inner.lock().fail_submit_once = true;
    }

    /// Make the next capture_pane call fail.
    pub fn fail_next_capture(&self) {
        self.inner.lock().fail_capture_once = true;
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<TerminalCall> {
        self.inner.lock().calls.iter().map(|(c, _)| c.clone()).collect()
    }

    /// Recorded calls with their timestamps.
    pub fn timed_calls(&self) -> Vec<(TerminalCall, Instant)> {
        self.inner.lock().calls.clone()
    }

    /// Only the injection-relevant calls (cancel/text/submit), in order.
    pub fn injection_calls(&self) -> Vec<TerminalCall> {
        self.calls()
            .into_iter()
            .filter(|c| {
                matches!(
                    c,
                    TerminalCall::SendLiteralText { .. }
                        | TerminalCall::SendSubmitKey { .. }
                        | TerminalCall::SendCancelKey { .. }
                )
            })
            .collect()
    }

    fn record(&self, call: TerminalCall) {
        self.inner.lock().calls.push((call, Instant::now()));
    }

    fn pane_alive(&self, pane: &str) -> bool {
        self.inner
            .lock()
            .panes
            .get(pane)
            .map(|p| p.alive)
            .unwrap_or(false)
    }
}

#[async_trait]
impl TerminalAdapter for FakeTerminalAdapter {
    async fn spawn(
        &self,
        name: &str,
        _cwd: &Path,
        cmd: &str,
        _env: &[(String, String)],
    ) -> Result<String, TerminalError> {
        self.record(TerminalCall::Spawn {
            name: name.to_string(),
            cmd: cmd.to_string(),
        });
        let pane_id = format!("sesh-{}", name);
        self.inner.lock().panes.insert(
            pane_id.clone(),
            FakePane {
                alive: true,
                capture: String::new(),
            },
        );
        Ok(pane_id)
    }

    async fn send_literal_text(&self, pane: &str, text: &str) -> Result<(), TerminalError> {
        self.record(TerminalCall::SendLiteralText {
            pane: pane.to_string(),
            text: text.to_string(),
        });
        let fail = {
            let mut state = self.inner.lock();
            std::mem::take(&mut state.fail_literal_once)
        };
        if fail {
            return Err(TerminalError::CommandFailed("forced literal failure".into()));
        }
        if !self.pane_alive(pane) {
            return Err(TerminalError::NotFound(pane.to_string()));
        }
        Ok(())
    }

    async fn send_submit_key(&self, pane: &str) -> Result<(), TerminalError> {
        self.record(TerminalCall::SendSubmitKey {
            pane: pane.to_string(),
        });
        let fail = {
            let mut state = self.inner.lock();
            std::mem::take(&mut state.fail_submit_once)
        };
        if fail {
            return Err(TerminalError::CommandFailed("forced submit failure".into()));
        }
        if !self.pane_alive(pane) {
            return Err(TerminalError::NotFound(pane.to_string()));
        }
        Ok(())
    }

    async fn send_cancel_key(&self, pane: &str) -> Result<(), TerminalError> {
        self.record(TerminalCall::SendCancelKey {
            pane: pane.to_string(),
        });
        if !self.pane_alive(pane) {
            return Err(TerminalError::NotFound(pane.to_string()));
        }
        Ok(())
    }

    async fn send_key(&self, pane: &str, key: &str) -> Result<(), TerminalError> {
        self.record(TerminalCall::SendKey {
            pane: pane.to_string(),
            key: key.to_string(),
        });
        if !self.pane_alive(pane) {
            return Err(TerminalError::NotFound(pane.to_string()));
        }
        Ok(())
    }

    async fn capture_pane(&self, pane: &str, from_start: bool) -> Result<String, TerminalError> {
        self.record(TerminalCall::CapturePane {
            pane: pane.to_string(),
            from_start,
        });
        let fail = {
            let mut state = self.inner.lock();
            std::mem::take(&mut state.fail_capture_once)
        };
        if fail {
            return Err(TerminalError::CommandFailed("forced capture failure".into()));
        }
        self.inner
            .lock()
            .panes
            .get(pane)
            .filter(|p| p.alive)
            .map(|p| p.capture.clone())
            .ok_or_else(|| TerminalError::NotFound(pane.to_string()))
    }

    async fn capture_last(&self, pane: &str, lines: u32) -> Result<String, TerminalError> {
        self.record(TerminalCall::CaptureLast {
            pane: pane.to_string(),
            lines,
        });
        self.inner
            .lock()
            .panes
            .get(pane)
            .filter(|p| p.alive)
            .map(|p| {
                let all: Vec<&str> = p.capture.lines().collect();
                let start = all.len().saturating_sub(lines as usize);
                all[start..].join("\n")
            })
            .ok_or_else(|| TerminalError::NotFound(pane.to_string()))
    }

    async fn kill(&self, pane: &str) -> Result<(), TerminalError> {
        self.record(TerminalCall::Kill {
            pane: pane.to_string(),
        });
        if let Some(p) = self.inner.lock().panes.get_mut(pane) {
            p.alive = false;
        }
        Ok(())
    }

    async fn exists(&self, pane: &str) -> Result<bool, TerminalError> {
        self.record(TerminalCall::Exists {
            pane: pane.to_string(),
        });
        Ok(self.pane_alive(pane))
    }

    async fn pipe_log(&self, pane: &str, path: &Path) -> Result<(), TerminalError> {
        self.record(TerminalCall::PipeLog {
            pane: pane.to_string(),
            path: path.to_path_buf(),
        });
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
