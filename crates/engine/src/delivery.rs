// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Delivery engine: the durable queue front-end, per-target locks, and the
//! three delivery modes.
//!
//! Injection is always two-phase: literal text, a settle delay, then the
//! submit key as a separate driver call. A combined text+return injection
//! trips the agent's paste-detection heuristic and the return is consumed
//! as a literal character. The per-target lock is held for the whole
//! cancel + settle + text + submit sequence, so an urgent send can never
//! interleave with a stop-hook-triggered flush.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::registry::SessionRegistry;
use crate::tracker::{pane_shows_idle, IdleTracker};
use parking_lot::Mutex;
use sesh_adapters::TerminalAdapter;
use sesh_core::{DeliveryMode, NewMessage, QueuedMessage, Session};
use sesh_storage::MessageQueue;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Extra settle time per character of injected text, capped. The TUI
/// re-renders per keystroke, so long messages need longer to land.
const SETTLE_SCALE_CAP: Duration = Duration::from_millis(1700);

pub struct DeliveryEngine<T: TerminalAdapter> {
    terminal: T,
    queue: Arc<MessageQueue>,
    registry: Arc<SessionRegistry>,
    tracker: Arc<IdleTracker>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    config: Arc<EngineConfig>,
}

impl<T: TerminalAdapter> DeliveryEngine<T> {
    pub fn new(
        terminal: T,
        queue: Arc<MessageQueue>,
        registry: Arc<SessionRegistry>,
        tracker: Arc<IdleTracker>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            terminal,
            queue,
            registry,
            tracker,
            locks: Mutex::new(HashMap::new()),
            config,
        }
    }

    pub fn queue(&self) -> &Arc<MessageQueue> {
        &self.queue
    }

    /// The delivery lock for a target. One injection at a time per pane.
    pub fn lock_for(&self, target: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(locks.entry(target.to_string()).or_default())
    }

    /// Enqueue a message, performing sanity checks and mode dispatch.
    ///
    /// URGENT is delivered inline; errors surface to the caller but the row
    /// stays queued for sequential retry on the next idle signal.
    pub async fn enqueue(self: &Arc<Self>, msg: NewMessage) -> Result<QueuedMessage, EngineError> {
        let target = msg.target_id.as_str().to_string();
        let session = self
            .registry
            .get(&target)
            .ok_or_else(|| EngineError::NotFound(target.clone()))?;
        if session.is_stopped() {
            return Err(EngineError::InvalidState(format!(
                "session {} is stopped",
                target
            )));
        }
        if session.tmux_name.is_none() {
            return Err(EngineError::InvalidState(format!(
                "session {} has no pane to deliver into",
                target
            )));
        }

        let row = self.queue.enqueue(msg)?;

        match row.mode {
            DeliveryMode::Urgent => {
                // Urgent enqueue flips the target active immediately
                self.tracker.mark_active(&target);
                self.deliver_urgent(&session, &row).await?;
            }
            DeliveryMode::Sequential | DeliveryMode::Important => {
                if self.tracker.is_idle(&target) {
                    self.spawn_flush(&target);
                }
            }
        }

        Ok(row)
    }

    /// Flush the target's pending messages on its own task.
    pub fn spawn_flush(self: &Arc<Self>, target: &str) {
        let engine = Arc::clone(self);
        let target = target.to_string();
        tokio::spawn(async move {
            engine.flush_target(&target).await;
        });
    }

    /// Drain pending messages FIFO under the target's delivery lock.
    ///
    /// Any failure leaves the current row undelivered and stops the flush;
    /// the next idle signal retries from the same row.
    pub async fn flush_target(&self, target: &str) {
        let lock = self.lock_for(target);
        let _guard = lock.lock().await;

        loop {
            let next = match self.queue.next_pending(target) {
                Ok(Some(msg)) => msg,
                Ok(None) => break,
                Err(e) => {
                    warn!(target, error = %e, "queue read failed during flush");
                    break;
                }
            };

            let Some(session) = self.registry.get(target) else {
                break;
            };
            if session.is_stopped() {
                break;
            }
            let Some(pane) = session.tmux_name.clone() else {
                break;
            };

            if let Err(e) = self.inject(&pane, &format_message(&next)).await {
                warn!(target, message_id = %next.id, error = %e, "delivery failed, will retry on next idle");
                break;
            }

            if let Err(e) = self.queue.complete(&next.id) {
                warn!(target, message_id = %next.id, error = %e, "failed to complete delivered message");
                break;
            }

            debug!(target, message_id = %next.id, mode = %next.mode, "delivered");
            self.tracker.mark_active(target);
            self.registry.touch_activity(target);
        }
    }

    /// Urgent path: lock, cancel key, prompt poll, then inject.
    async fn deliver_urgent(
        &self,
        session: &Session,
        msg: &QueuedMessage,
    ) -> Result<(), EngineError> {
        let target = session.id.as_str();
        let Some(pane) = session.tmux_name.clone() else {
            return Err(EngineError::InvalidState(format!(
                "session {} has no pane",
                target
            )));
        };

        // Lock acquired before the cancel key so a concurrent flush cannot
        // interleave with the preemption sequence.
        let lock = self.lock_for(target);
        let _guard = lock.lock().await;

        self.terminal.send_cancel_key(&pane).await?;
        self.wait_for_prompt(session, &pane).await;

        self.inject(&pane, &format_message(msg)).await?;
        self.queue.complete(&msg.id)?;
        self.registry.touch_activity(target);
        Ok(())
    }

    /// Poll the pane for the provider's input-prompt signature, bounded by
    /// the urgent poll budget. Not finding the prompt is not fatal — the
    /// injection proceeds anyway and the settle delay does the rest.
    async fn wait_for_prompt(&self, session: &Session, pane: &str) {
        let Some(glyph) = session.provider.prompt_glyph() else {
            return;
        };
        let deadline = tokio::time::Instant::now() + self.config.urgent_poll_budget;
        loop {
            match self.terminal.capture_last(pane, 40).await {
                Ok(capture) if pane_shows_idle(glyph, &capture) => return,
                Ok(_) => {}
                Err(e) => {
                    debug!(pane, error = %e, "capture failed while waiting for prompt");
                }
            }
            if tokio::time::Instant::now() >= deadline {
                warn!(pane, "prompt did not appear within urgent poll budget");
                return;
            }
            tokio::time::sleep(self.config.urgent_poll_interval).await;
        }
    }

    /// Two-phase injection: literal text, settle, submit key.
    ///
    /// Both driver calls report failure independently and both failures are
    /// recoverable — the caller leaves the row queued and retries later.
    pub async fn inject(&self, pane: &str, text: &str) -> Result<(), EngineError> {
        self.terminal.send_literal_text(pane, text).await?;

        let scaled = Duration::from_millis(text.len() as u64).min(SETTLE_SCALE_CAP);
        tokio::time::sleep(self.config.settle + scaled).await;

        self.terminal.send_submit_key(pane).await?;
        Ok(())
    }
}

/// User-visible rendering of a queued message.
///
/// The modes differ only here: IMPORTANT and URGENT get a prefix the agent
/// is primed to prioritize; ordering and persistence are identical.
pub fn format_message(msg: &QueuedMessage) -> String {
    let body = match &msg.sender_id {
        Some(sender) => format!("Message from {}: {}", sender, msg.text),
        None => msg.text.clone(),
    };
    match msg.mode {
        DeliveryMode::Sequential => body,
        DeliveryMode::Important => format!("[IMPORTANT] {}", body),
        DeliveryMode::Urgent => format!("[URGENT] {}", body),
    }
}

#[cfg(test)]
#[path = "delivery_tests.rs"]
mod tests;
