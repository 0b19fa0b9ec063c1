// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queued message records and delivery modes.

use crate::session::SessionId;
use serde::{Deserialize, Serialize};

/// Category marking system-origin context-monitor notifications.
///
/// This is the only key used to selectively cancel compaction/warning
/// messages without disturbing user `send` traffic. Never set it on
/// user-originated messages.
pub const CONTEXT_MONITOR: &str = "context_monitor";

/// How a message is delivered to its target.
///
/// The modes differ in preemption and in the user-visible prefix, not in
/// persistence: all three are durable rows until delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Deliver only when the target is idle, FIFO.
    Sequential,
    /// Same ordering as sequential; flagged prominently in the prompt.
    Important,
    /// Preempt the target's current work (cancel key, then deliver).
    Urgent,
}

impl Default for DeliveryMode {
    fn default() -> Self {
        DeliveryMode::Sequential
    }
}

impl std::fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryMode::Sequential => write!(f, "sequential"),
            DeliveryMode::Important => write!(f, "important"),
            DeliveryMode::Urgent => write!(f, "urgent"),
        }
    }
}

impl std::str::FromStr for DeliveryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sequential" => Ok(DeliveryMode::Sequential),
            "important" => Ok(DeliveryMode::Important),
            "urgent" => Ok(DeliveryMode::Urgent),
            other => Err(format!("unknown delivery mode: {}", other)),
        }
    }
}

/// A message accepted into the durable queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedMessage {
    pub id: String,
    pub target_id: SessionId,
    pub sender_id: Option<SessionId>,
    /// Parent pairing for wake-up digests
    pub parent_id: Option<SessionId>,
    pub text: String,
    pub mode: DeliveryMode,
    /// `Some(CONTEXT_MONITOR)` for system notifications, `None` for user traffic
    pub category: Option<String>,
    pub queued_at_ms: u64,
    pub delivered_at_ms: Option<u64>,
}

/// Parameters for enqueueing a message.
#[derive(Debug, Clone, Default)]
pub struct NewMessage {
    pub target_id: SessionId,
    pub sender_id: Option<SessionId>,
    pub parent_id: Option<SessionId>,
    pub text: String,
    pub mode: DeliveryMode,
    pub category: Option<String>,
}

impl NewMessage {
    pub fn to(target: impl Into<SessionId>, text: impl Into<String>) -> Self {
        Self {
            target_id: target.into(),
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn mode(mut self, mode: DeliveryMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn from_sender(mut self, sender: impl Into<SessionId>) -> Self {
        self.sender_id = Some(sender.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Pair the message with the session it reports on (wake-up digests).
    pub fn paired_with(mut self, session: impl Into<SessionId>) -> Self {
        self.parent_id = Some(session.into());
        self
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
