// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Idle & activity tracker.
//!
//! The tracker is the arbiter of whether a session is idle. It reconciles
//! three signal classes: stop/notification hooks (claude_tmux), prompt
//! inspection via pane capture (claude_tmux, codex_tmux), and the provider
//! RPC (codex_app). Hook arrival order is not guaranteed; the skip fence
//! absorbs the hook storm a handoff's `/clear` produces.

use crate::config::EngineConfig;
use parking_lot::Mutex;
use sesh_core::{epoch_ms_now, DeliveryState, FenceDisposition, SessionId};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// What a stop signal resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopSignalOutcome {
    /// Absorbed by the skip fence; the session stays RUNNING.
    Absorbed,
    /// Pending-handoff branch: enqueue the wake message for this path.
    Handoff {
        continuation: PathBuf,
        dump: Option<PathBuf>,
    },
    /// Genuine idle transition.
    Idle,
}

/// Per-target delivery state, reconciled from asynchronous signals.
pub struct IdleTracker {
    states: Mutex<HashMap<String, DeliveryState>>,
    config: Arc<EngineConfig>,
}

impl IdleTracker {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Run `f` against the target's state, creating it lazily.
    pub fn with_state<T>(&self, id: &str, f: impl FnOnce(&mut DeliveryState) -> T) -> T {
        let mut states = self.states.lock();
        f(states.entry(id.to_string()).or_default())
    }

    pub fn is_idle(&self, id: &str) -> bool {
        self.states.lock().get(id).map(|s| s.is_idle).unwrap_or(false)
    }

    pub fn mark_active(&self, id: &str) {
        self.with_state(id, |s| s.mark_active(epoch_ms_now()));
    }

    pub fn mark_idle(&self, id: &str) {
        self.with_state(id, |s| s.mark_idle(epoch_ms_now()));
    }

    /// Destroy the state with its session.
    pub fn remove(&self, id: &str) {
        self.states.lock().remove(id);
    }

    /// Arm the skip fence ahead of a `/clear`.
    pub fn arm_skip_fence(&self, id: &str) {
        self.with_state(id, |s| s.arm_skip_fence(Instant::now()));
    }

    pub fn set_pending_handoff(&self, id: &str, continuation: PathBuf, dump: Option<PathBuf>) {
        self.with_state(id, |s| {
            s.pending_handoff_path = Some(continuation);
            s.pending_handoff_dump = dump;
        });
    }

    pub fn clear_pending_handoff(&self, id: &str) {
        self.with_state(id, |s| {
            s.pending_handoff_path = None;
            s.pending_handoff_dump = None;
        });
    }

    pub fn set_stop_notify(&self, id: &str, sender: SessionId) {
        self.with_state(id, |s| s.stop_notify_sender_id = Some(sender));
    }

    /// Take the stop-notify sender, suppressing self-echo: if the target's
    /// last outgoing send went to the would-be notify recipient, that
    /// recipient has already heard from the target directly.
    pub fn take_stop_notify(&self, id: &str) -> Option<SessionId> {
        self.with_state(id, |s| {
            let sender = s.stop_notify_sender_id.take()?;
            if s.last_outgoing_send_target.as_ref() == Some(&sender) {
                debug!(target = id, notify = %sender, "suppressing self-echo stop notification");
                None
            } else {
                Some(sender)
            }
        })
    }

    pub fn set_last_outgoing(&self, sender: &str, target: SessionId) {
        self.with_state(sender, |s| s.last_outgoing_send_target = Some(target));
    }

    /// Route a stop signal through the fence and the pending-handoff branch.
    ///
    /// An absorbed signal still fires the handoff branch: the `/clear` hook
    /// is exactly the signal the pending path is waiting for. Past the TTL
    /// the whole fence is reset and any pending handoff is abandoned (the
    /// clear hook was lost in transport).
    pub fn on_stop_signal(&self, id: &str) -> StopSignalOutcome {
        let now = Instant::now();
        let ttl = self.config.fence_ttl;
        self.with_state(id, |s| match s.fence_disposition(now, ttl) {
            FenceDisposition::Absorb => match s.pending_handoff_path.take() {
                Some(continuation) => StopSignalOutcome::Handoff {
                    continuation,
                    dump: s.pending_handoff_dump.take(),
                },
                None => StopSignalOutcome::Absorbed,
            },
            FenceDisposition::ExpiredReset => {
                if s.pending_handoff_path.take().is_some() {
                    s.pending_handoff_dump = None;
                    warn!(target = id, "fence expired with pending handoff, abandoning wake");
                }
                s.mark_idle(epoch_ms_now());
                StopSignalOutcome::Idle
            }
            FenceDisposition::Pass => match s.pending_handoff_path.take() {
                // Late branch: the absorb happened elsewhere but the wake
                // has not fired yet; honor it rather than lose the handoff.
                Some(continuation) => StopSignalOutcome::Handoff {
                    continuation,
                    dump: s.pending_handoff_dump.take(),
                },
                None => {
                    s.mark_idle(epoch_ms_now());
                    StopSignalOutcome::Idle
                }
            },
        })
    }

    /// Read the last assistant response from a transcript with the bounded
    /// retry policy: one retry after `transcript_null_retry` when the read
    /// returns nothing, one retry after `transcript_stale_retry` when it
    /// equals the previously stored response. The preconditions are
    /// disjoint, so at most one retry happens per stop signal.
    pub async fn read_stop_response(&self, id: &str, transcript: &Path) -> Option<String> {
        let stored = self.with_state(id, |s| s.last_response.clone());

        let first = read_last_assistant_response(transcript).await;
        let retry_delay = match &first {
            None => Some(self.config.transcript_null_retry),
            Some(r) if Some(r) == stored.as_ref() => Some(self.config.transcript_stale_retry),
            Some(_) => None,
        };
        let response = match retry_delay {
            Some(delay) => {
                tokio::time::sleep(delay).await;
                read_last_assistant_response(transcript).await
            }
            None => first,
        };

        match response {
            Some(r) if Some(&r) != stored.as_ref() => {
                self.with_state(id, |s| s.last_response = Some(r.clone()));
                Some(r)
            }
            // Both retries failed (still empty or still stale): proceed
            // without the response payload.
            _ => None,
        }
    }
}

/// Check whether a pane capture shows the provider's idle prompt.
///
/// The last non-empty line, trimmed of trailing whitespace, must equal the
/// glyph exactly. A line like `"> draft reply"` is a typed-but-unsubmitted
/// composer, not an idle prompt.
pub fn pane_shows_idle(glyph: &str, capture: &str) -> bool {
    capture
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .map(|line| line.trim_end() == glyph)
        .unwrap_or(false)
}

/// Parse the last assistant turn out of a JSONL transcript.
///
/// Transcript lines are JSON objects; assistant turns carry
/// `{"type":"assistant","message":{"content":[{"type":"text","text":…}]}}`.
async fn read_last_assistant_response(path: &Path) -> Option<String> {
    let contents = tokio::fs::read_to_string(path).await.ok()?;
    for line in contents.lines().rev() {
        let json: serde_json::Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(_) => continue,
        };
        if json.get("type").and_then(|v| v.as_str()) != Some("assistant") {
            continue;
        }
        let content = json.get("message")?.get("content")?.as_array()?;
        let text: Vec<&str> = content
            .iter()
            .filter(|block| block.get("type").and_then(|v| v.as_str()) == Some("text"))
            .filter_map(|block| block.get("text").and_then(|v| v.as_str()))
            .collect();
        if text.is_empty() {
            continue;
        }
        return Some(text.join("\n"));
    }
    None
}

#[cfg(test)]
#[path = "tracker_tests.rs"]
mod tests;
