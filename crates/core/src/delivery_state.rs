// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-target delivery state: idle flag, skip fence, handoff branch.
//!
//! One DeliveryState exists per live session, created lazily and destroyed
//! with the session. The skip fence `(count, armed_at)` absorbs the stop
//! hook caused by a handoff's `/clear` so the re-primed session keeps its
//! RUNNING status across the hook storm.

use crate::session::SessionId;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// What the tracker should do with an incoming stop signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceDisposition {
    /// Fence armed and fresh: swallow the signal, do not mark idle.
    Absorb,
    /// Fence armed but past TTL: reset the fence, then process normally.
    ExpiredReset,
    /// No fence: process normally.
    Pass,
}

/// Ephemeral per-target delivery state, snapshot-free.
#[derive(Debug, Default)]
pub struct DeliveryState {
    pub is_idle: bool,
    pub last_idle_at_ms: Option<u64>,
    pub last_active_at_ms: Option<u64>,
    /// Number of stop signals the fence should absorb
    pub stop_notify_skip_count: u32,
    /// When the fence was armed; cleared together with the count
    pub skip_count_armed_at: Option<Instant>,
    /// Session to notify when this target next stops
    pub stop_notify_sender_id: Option<SessionId>,
    /// Last session this target sent a message to (self-echo suppression)
    pub last_outgoing_send_target: Option<SessionId>,
    /// Continuation path consumed by the next stop signal after a handoff
    pub pending_handoff_path: Option<PathBuf>,
    /// Scrollback dump captured by the handoff, referenced in the wake message
    pub pending_handoff_dump: Option<PathBuf>,
    /// Last assistant response read from the transcript (stale detection)
    pub last_response: Option<String>,
}

impl DeliveryState {
    /// Arm the skip fence: one more stop signal will be absorbed.
    pub fn arm_skip_fence(&mut self, now: Instant) {
        self.stop_notify_skip_count += 1;
        self.skip_count_armed_at = Some(now);
    }

    /// Classify an incoming stop signal against the fence.
    ///
    /// `Absorb` decrements the count; when it reaches zero the armed_at
    /// timestamp is cleared with it. `ExpiredReset` clears both fields
    /// atomically (defence against a lost clear-hook).
    pub fn fence_disposition(&mut self, now: Instant, ttl: Duration) -> FenceDisposition {
        if self.stop_notify_skip_count == 0 {
            return FenceDisposition::Pass;
        }
        let fresh = self
            .skip_count_armed_at
            .map(|armed| now.duration_since(armed) < ttl)
            .unwrap_or(false);
        if fresh {
            self.stop_notify_skip_count -= 1;
            if self.stop_notify_skip_count == 0 {
                self.skip_count_armed_at = None;
            }
            FenceDisposition::Absorb
        } else {
            self.clear_fence();
            FenceDisposition::ExpiredReset
        }
    }

    /// Clear the entire fence (count and timestamp together).
    pub fn clear_fence(&mut self) {
        self.stop_notify_skip_count = 0;
        self.skip_count_armed_at = None;
    }

    pub fn mark_idle(&mut self, at_ms: u64) {
        self.is_idle = true;
        self.last_idle_at_ms = Some(at_ms);
    }

    pub fn mark_active(&mut self, at_ms: u64) {
        self.is_idle = false;
        self.last_active_at_ms = Some(at_ms);
    }
}

#[cfg(test)]
#[path = "delivery_state_tests.rs"]
mod tests;
