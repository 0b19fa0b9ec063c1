// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reminder scheduler: per-target soft/hard reminders and parent wake-up
//! digests.
//!
//! Reminders poll on a short interval rather than sleeping to the deadline,
//! so a status-update reset or a compaction window is observed within one
//! poll. The compaction interlock matters: reminding an agent that is
//! flushing its context window triggers a secondary compaction.

use crate::config::EngineConfig;
use crate::delivery::DeliveryEngine;
use crate::registry::SessionRegistry;
use parking_lot::Mutex;
use sesh_adapters::TerminalAdapter;
use sesh_core::{
    epoch_ms_now, format_elapsed, DeliveryMode, NewMessage, ParentWakeRegistration,
    RemindRegistration, Session, SessionId,
};
use sesh_storage::{ToolUsageStore, ToolUseEntry};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{info, warn};

struct RemindHandle {
    reg: Arc<Mutex<RemindRegistration>>,
    _shutdown: oneshot::Sender<()>,
}

struct WakeHandle {
    _reg: Arc<Mutex<ParentWakeRegistration>>,
    _shutdown: oneshot::Sender<()>,
}

pub struct RemindScheduler<T: TerminalAdapter> {
    delivery: Arc<DeliveryEngine<T>>,
    registry: Arc<SessionRegistry>,
    tooluse: Arc<ToolUsageStore>,
    config: Arc<EngineConfig>,
    reminds: Mutex<HashMap<String, RemindHandle>>,
    wakes: Mutex<HashMap<String, WakeHandle>>,
}

impl<T: TerminalAdapter> RemindScheduler<T> {
    pub fn new(
        delivery: Arc<DeliveryEngine<T>>,
        registry: Arc<SessionRegistry>,
        tooluse: Arc<ToolUsageStore>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            delivery,
            registry,
            tooluse,
            config,
            reminds: Mutex::new(HashMap::new()),
            wakes: Mutex::new(HashMap::new()),
        }
    }

    /// Register (or replace) the reminder for a dispatched target.
    pub fn register_remind(
        self: &Arc<Self>,
        target: &SessionId,
        parent: Option<SessionId>,
        soft: Option<Duration>,
        hard: Option<Duration>,
    ) {
        let mut reg = RemindRegistration::new(target.clone(), parent, epoch_ms_now());
        if let Some(soft) = soft {
            reg.soft_threshold = soft;
        }
        if let Some(hard) = hard {
            reg.hard_threshold = hard;
        }

        let reg = Arc::new(Mutex::new(reg));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let scheduler = Arc::clone(self);
        let target_id = target.as_str().to_string();
        tokio::spawn(scheduler.remind_task(target_id.clone(), Arc::clone(&reg), shutdown_rx));

        // Replacing an existing registration drops its shutdown sender,
        // which stops the old task at its next poll.
        self.reminds.lock().insert(
            target_id,
            RemindHandle {
                reg,
                _shutdown: shutdown_tx,
            },
        );
    }

    /// Register (or replace) the wake digest for a child under dispatch.
    pub fn register_wake(self: &Arc<Self>, child: &SessionId, parent: &SessionId) {
        let reg = Arc::new(Mutex::new(ParentWakeRegistration::new(
            child.clone(),
            parent.clone(),
        )));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let scheduler = Arc::clone(self);
        tokio::spawn(scheduler.wake_task(Arc::clone(&reg), shutdown_rx));

        self.wakes.lock().insert(
            child.as_str().to_string(),
            WakeHandle {
                _reg: reg,
                _shutdown: shutdown_tx,
            },
        );
    }

    /// Reset the reminder clock after an explicit agent status update.
    pub fn status_update(&self, target: &str) -> bool {
        let reminds = self.reminds.lock();
        match reminds.get(target) {
            Some(handle) => {
                handle.reg.lock().reset(epoch_ms_now());
                true
            }
            None => false,
        }
    }

    /// Cancel the reminder and wake registrations for a target.
    ///
    /// Called on target idle, clear, and kill. Tasks observe the dropped
    /// shutdown channel at their next poll boundary.
    pub fn cancel(&self, target: &str) {
        if self.reminds.lock().remove(target).is_some() {
            info!(target, "reminder cancelled");
        }
        if self.wakes.lock().remove(target).is_some() {
            info!(target, "parent wake cancelled");
        }
    }

    /// Whether a reminder registration exists (for introspection/tests).
    pub fn has_remind(&self, target: &str) -> bool {
        self.reminds.lock().contains_key(target)
    }

    pub fn has_wake(&self, child: &str) -> bool {
        self.wakes.lock().contains_key(child)
    }

    async fn remind_task(
        self: Arc<Self>,
        target: String,
        reg: Arc<Mutex<RemindRegistration>>,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) {
        // Tracks how long a due reminder has been held back by compaction
        let mut compaction_wait: Option<Instant> = None;

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => break,
                _ = tokio::time::sleep(self.config.remind_poll) => {}
            }

            let Some(session) = self.registry.get(&target) else {
                break;
            };
            if session.is_stopped() {
                break;
            }

            let now_ms = epoch_ms_now();
            let (elapsed, soft_fired, soft_threshold, hard_threshold) = {
                let r = reg.lock();
                if !r.active {
                    return;
                }
                (r.elapsed(now_ms), r.soft_fired, r.soft_threshold, r.hard_threshold)
            };

            let due_hard = elapsed >= hard_threshold;
            let due_soft = elapsed >= soft_threshold && !soft_fired;
            if !due_hard && !due_soft {
                compaction_wait = None;
                continue;
            }

            // Compaction interlock: hold the one-shot delivery back while
            // the agent is compacting, bounded by a hard ceiling.
            if session.is_compacting {
                let started = *compaction_wait.get_or_insert_with(Instant::now);
                if started.elapsed() < self.config.compaction_wait_ceiling {
                    continue;
                }
                warn!(
                    target,
                    "compaction exceeded wait ceiling, delivering reminder anyway"
                );
            }
            compaction_wait = None;

            if due_hard {
                let text = format!(
                    "No status update for {}. Stop what you are doing and reply with a status update immediately.",
                    format_elapsed(elapsed.as_secs())
                );
                match self
                    .delivery
                    .enqueue(
                        NewMessage::to(target.as_str(), text).mode(DeliveryMode::Urgent),
                    )
                    .await
                {
                    Ok(_) => {
                        // Hard reminder restarts the cycle
                        reg.lock().reset(epoch_ms_now());
                        info!(target, "hard reminder delivered");
                    }
                    Err(e) => warn!(target, error = %e, "hard reminder delivery failed"),
                }
            } else if due_soft {
                let text = format!(
                    "Reminder: no status update for {}. Please reply with a brief status update.",
                    format_elapsed(elapsed.as_secs())
                );
                match self
                    .delivery
                    .enqueue(
                        NewMessage::to(target.as_str(), text).mode(DeliveryMode::Important),
                    )
                    .await
                {
                    Ok(_) => {
                        reg.lock().soft_fired = true;
                        info!(target, "soft reminder enqueued");
                    }
                    Err(e) => warn!(target, error = %e, "soft reminder enqueue failed"),
                }
            }
        }
    }

    async fn wake_task(
        self: Arc<Self>,
        reg: Arc<Mutex<ParentWakeRegistration>>,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) {
        let (child, parent) = {
            let r = reg.lock();
            (r.child_id.as_str().to_string(), r.parent_id.as_str().to_string())
        };

        loop {
            let period = reg.lock().period;
            tokio::select! {
                _ = &mut shutdown_rx => break,
                _ = tokio::time::sleep(period) => {}
            }

            // Parent gone before the tick: cancel rather than digest into
            // the void.
            let parent_session = self.registry.get(&parent);
            if parent_session.map(|p| p.is_stopped()).unwrap_or(true) {
                warn!(child, parent, "wake parent gone, cancelling registration");
                self.wakes.lock().remove(&child);
                break;
            }

            let Some(child_session) = self.registry.get(&child) else {
                break;
            };
            if child_session.is_stopped() {
                break;
            }

            // Escalate when the child's status has not moved between ticks
            {
                let mut r = reg.lock();
                let status_at = child_session.agent_status_at_ms;
                if r.last_wake_at_ms.is_some()
                    && r.last_status_at_prev_wake == status_at
                    && !r.escalated
                {
                    info!(child, "child status unchanged between wakes, escalating period");
                    r.escalate();
                }
                r.last_status_at_prev_wake = status_at;
                r.last_wake_at_ms = Some(epoch_ms_now());
            }

            let tools = self
                .tooluse
                .last_for(&child, 5)
                .unwrap_or_default();
            let digest = build_wake_digest(&child_session, &tools);

            if let Err(e) = self
                .delivery
                .enqueue(
                    NewMessage::to(parent.as_str(), digest)
                        .mode(DeliveryMode::Important)
                        .paired_with(child_session.id.clone()),
                )
                .await
            {
                warn!(child, parent, error = %e, "wake digest enqueue failed");
            }
        }
    }
}

/// Build the parent wake digest: child status, elapsed time, recent tools.
pub fn build_wake_digest(child: &Session, tools: &[ToolUseEntry]) -> String {
    let elapsed_s = epoch_ms_now().saturating_sub(child.created_at_ms) / 1000;
    let status = child.agent_status.as_deref().unwrap_or("(no status reported)");

    let mut digest = format!(
        "Status digest for {}: {} ({} since dispatch).",
        child.display_name(),
        status,
        format_elapsed(elapsed_s)
    );
    if tools.is_empty() {
        digest.push_str(" No tool use recorded.");
    } else {
        let names: Vec<&str> = tools.iter().map(|t| t.tool_name.as_str()).collect();
        digest.push_str(&format!(" Recent tools: {}.", names.join(", ")));
    }
    digest
}

#[cfg(test)]
#[path = "reminders_tests.rs"]
mod tests;
