// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handoff coordinator: the clear-then-reprime context reset.
//!
//! A handoff captures the pane's scrollback, arms the skip fence, stores a
//! continuation path, and issues `/clear`. The stop hook the clear produces
//! is absorbed by the fence and routed through the pending-handoff branch,
//! which enqueues the wake message — state carried across a terminal reset
//! by making the next stop signal the trigger rather than racing the clear.

use crate::error::EngineError;
use crate::runtime::Runtime;
use sesh_adapters::TerminalAdapter;
use sesh_core::Session;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

impl<T: TerminalAdapter> Runtime<T> {
    /// The atomic context-reset protocol: snapshot, arm fence, store the
    /// pending continuation, issue `/clear`. The wake message is enqueued
    /// when the clear's stop signal arrives (pending-handoff branch).
    ///
    /// Serialized against every delivery to the target via the per-target
    /// lock, so a handoff can never race a user send; a second handoff
    /// queues behind the first.
    pub async fn handoff(
        &self,
        identifier: &str,
        continuation: PathBuf,
    ) -> Result<(), EngineError> {
        let session = self.registry.resolve(identifier)?;
        let id = session.id.as_str();
        if !session.provider.has_hooks() {
            return Err(EngineError::InvalidState(format!(
                "handoff requires a hook-capable session (got {})",
                session.provider
            )));
        }
        let pane = session.tmux_name.clone().ok_or_else(|| {
            EngineError::InvalidState(format!("session {} has no pane", session.id))
        })?;

        let lock = self.delivery.lock_for(id);
        let _guard = lock.lock().await;

        // 1. Best-effort scrollback snapshot
        let dump = self.capture_handoff_dump(id, &pane).await;

        // 2. Arm the fence: the /clear below will produce a stop hook that
        //    must not mark the session idle.
        self.tracker.arm_skip_fence(id);

        // 3. The next stop signal routes through the pending-handoff branch
        self.tracker.set_pending_handoff(id, continuation, dump);

        // 4. Issue /clear through the two-phase injection contract
        if let Err(e) = self.delivery.inject(&pane, "/clear").await {
            // Abandoned: no wake message; the fence drains by TTL
            self.tracker.clear_pending_handoff(id);
            warn!(session_id = id, error = %e, "handoff abandoned: /clear injection failed");
            return Err(e);
        }

        // Clearing the context invalidates reminders and context notices
        self.reminders.cancel(id);
        let _ = self.queue().cancel_context_monitor_from(id);

        info!(session_id = id, "handoff initiated");
        Ok(())
    }

    async fn capture_handoff_dump(&self, id: &str, pane: &str) -> Option<PathBuf> {
        let contents = match self.terminal().capture_pane(pane, true).await {
            Ok(c) => c,
            Err(e) => {
                warn!(session_id = id, error = %e, "scrollback capture failed (wake will omit it)");
                return None;
            }
        };
        let dir = self
            .config
            .data_dir
            .join("handoffs")
            .join(format!("{}-{}", id, sesh_core::epoch_ms_now()));
        let path = dir.join("dump.txt");
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            warn!(session_id = id, error = %e, "handoff dir create failed");
            return None;
        }
        if let Err(e) = tokio::fs::write(&path, contents).await {
            warn!(session_id = id, error = %e, "handoff dump write failed");
            return None;
        }
        Some(path)
    }

    /// The IMPORTANT message that re-primes the agent after its context
    /// reset. The pipe-log path is referenced unconditionally; the
    /// scrollback snapshot only when the capture succeeded.
    pub(crate) fn wake_message(
        &self,
        session: &Session,
        continuation: &Path,
        dump: Option<&Path>,
    ) -> String {
        let pipe_log = session
            .tmux_name
            .as_ref()
            .map(|pane| self.config.pipe_log_dir.join(format!("{pane}.log")))
            .unwrap_or_default();
        let mut text = format!(
            "Context was reset. Read {} and continue the task from where it left off. \
             Full terminal history: {}",
            continuation.display(),
            pipe_log.display()
        );
        if let Some(dump) = dump {
            text.push_str(&format!("; scrollback snapshot: {}", dump.display()));
        }
        text
    }
}

#[cfg(test)]
#[path = "handoff_tests.rs"]
mod tests;
