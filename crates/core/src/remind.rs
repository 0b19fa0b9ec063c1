// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reminder and parent-wake registrations.

use crate::session::SessionId;
use std::time::Duration;

/// Default soft reminder threshold for dispatched children.
pub const DEFAULT_SOFT_THRESHOLD: Duration = Duration::from_secs(210);
/// Default hard reminder threshold for dispatched children.
pub const DEFAULT_HARD_THRESHOLD: Duration = Duration::from_secs(420);
/// Default parent wake period.
pub const DEFAULT_WAKE_PERIOD: Duration = Duration::from_secs(600);
/// Wake period after escalation (child status unchanged between ticks).
pub const ESCALATED_WAKE_PERIOD: Duration = Duration::from_secs(300);

/// One reminder registration per dispatched target.
///
/// Soft threshold fires an IMPORTANT reminder once; hard threshold fires an
/// URGENT reminder. Any explicit agent status update resets the timer.
#[derive(Debug, Clone)]
pub struct RemindRegistration {
    pub target_id: SessionId,
    pub parent_id: Option<SessionId>,
    pub soft_threshold: Duration,
    pub hard_threshold: Duration,
    pub last_reset_at_ms: u64,
    pub soft_fired: bool,
    pub active: bool,
}

impl RemindRegistration {
    pub fn new(target_id: SessionId, parent_id: Option<SessionId>, now_ms: u64) -> Self {
        Self {
            target_id,
            parent_id,
            soft_threshold: DEFAULT_SOFT_THRESHOLD,
            hard_threshold: DEFAULT_HARD_THRESHOLD,
            last_reset_at_ms: now_ms,
            soft_fired: false,
            active: true,
        }
    }

    /// Reset the clock after an agent status update.
    pub fn reset(&mut self, now_ms: u64) {
        self.last_reset_at_ms = now_ms;
        self.soft_fired = false;
    }

    pub fn elapsed(&self, now_ms: u64) -> Duration {
        Duration::from_millis(now_ms.saturating_sub(self.last_reset_at_ms))
    }
}

/// One wake registration per child under dispatch with a known parent.
#[derive(Debug, Clone)]
pub struct ParentWakeRegistration {
    pub child_id: SessionId,
    pub parent_id: SessionId,
    pub period: Duration,
    pub last_wake_at_ms: Option<u64>,
    /// Child's agent_status_at as of the previous tick, for escalation
    pub last_status_at_prev_wake: Option<u64>,
    /// One-way: once escalated the period stays at the escalated value
    pub escalated: bool,
}

impl ParentWakeRegistration {
    pub fn new(child_id: SessionId, parent_id: SessionId) -> Self {
        Self {
            child_id,
            parent_id,
            period: DEFAULT_WAKE_PERIOD,
            last_wake_at_ms: None,
            last_status_at_prev_wake: None,
            escalated: false,
        }
    }

    /// Escalate the wake period; idempotent and one-way.
    pub fn escalate(&mut self) {
        self.escalated = true;
        self.period = ESCALATED_WAKE_PERIOD;
    }
}

#[cfg(test)]
#[path = "remind_tests.rs"]
mod tests;
