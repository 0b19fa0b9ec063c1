// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime supervisor: wires the registry, tracker, delivery engine,
//! reminder scheduler, and watchers together and routes hook events.

use crate::config::EngineConfig;
use crate::delivery::DeliveryEngine;
use crate::error::EngineError;
use crate::registry::{CreateSession, SessionRegistry};
use crate::reminders::RemindScheduler;
use crate::tracker::{pane_shows_idle, IdleTracker, StopSignalOutcome};
use crate::watch::WatcherSet;
use sesh_adapters::{generate_pane_name, TerminalAdapter};
use sesh_core::{
    DeliveryMode, HookEventKind, HookPayload, NewMessage, Provider, QueuedMessage, Session,
    SessionId, SessionStatus, CONTEXT_MONITOR,
};
use sesh_storage::{MessageQueue, ToolUsageStore, ToolUseEntry};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Context usage percentage that triggers the one-shot warning notice.
const CONTEXT_WARN_PCT: u64 = 75;
/// Context usage percentage that triggers the one-shot critical notice.
const CONTEXT_CRIT_PCT: u64 = 90;

/// An operator-visible event the daemon may relay to the remote chat.
#[derive(Debug, Clone)]
pub struct Notice {
    pub session_id: String,
    pub text: String,
}

/// Adapter dependencies for the runtime.
pub struct RuntimeDeps<T> {
    pub terminal: T,
    pub queue: Arc<MessageQueue>,
    pub tooluse: Arc<ToolUsageStore>,
    pub registry: Arc<SessionRegistry>,
}

/// Parameters for spawning a session.
#[derive(Debug, Clone)]
pub struct SpawnSession {
    pub provider: Provider,
    pub working_dir: PathBuf,
    /// Agent command line; defaults to the provider binary
    pub command: Option<String>,
    pub parent_id: Option<SessionId>,
    pub friendly_name: String,
    pub is_em: bool,
    pub context_monitor_enabled: bool,
}

/// Parameters for enqueueing input to a session.
#[derive(Debug, Clone, Default)]
pub struct SendInput {
    pub target: String,
    pub text: String,
    pub mode: DeliveryMode,
    pub sender: Option<SessionId>,
    pub remind_soft: Option<Duration>,
    pub remind_hard: Option<Duration>,
    pub parent_id: Option<SessionId>,
    pub notify_on_stop: bool,
}

pub struct Runtime<T: TerminalAdapter> {
    pub config: Arc<EngineConfig>,
    pub registry: Arc<SessionRegistry>,
    pub tracker: Arc<IdleTracker>,
    pub delivery: Arc<DeliveryEngine<T>>,
    pub reminders: Arc<RemindScheduler<T>>,
    pub watchers: Arc<WatcherSet>,
    terminal: T,
    queue: Arc<MessageQueue>,
    tooluse: Arc<ToolUsageStore>,
    notice_tx: Option<mpsc::Sender<Notice>>,
}

impl<T: TerminalAdapter> Runtime<T> {
    pub fn new(
        deps: RuntimeDeps<T>,
        config: EngineConfig,
        notice_tx: Option<mpsc::Sender<Notice>>,
    ) -> Arc<Self> {
        let config = Arc::new(config);
        let tracker = Arc::new(IdleTracker::new(Arc::clone(&config)));
        let delivery = Arc::new(DeliveryEngine::new(
            deps.terminal.clone(),
            Arc::clone(&deps.queue),
            Arc::clone(&deps.registry),
            Arc::clone(&tracker),
            Arc::clone(&config),
        ));
        let reminders = Arc::new(RemindScheduler::new(
            Arc::clone(&delivery),
            Arc::clone(&deps.registry),
            Arc::clone(&deps.tooluse),
            Arc::clone(&config),
        ));

        Arc::new(Self {
            config,
            registry: deps.registry,
            tracker,
            delivery,
            reminders,
            watchers: Arc::new(WatcherSet::new()),
            terminal: deps.terminal,
            queue: deps.queue,
            tooluse: deps.tooluse,
            notice_tx,
        })
    }

    // ---------------------------------------------------------------------
    // Session lifecycle
    // ---------------------------------------------------------------------

    /// Spawn a session: create the pane (for pane providers), start the
    /// pipe-log, and register the record.
    pub async fn create_session(&self, params: SpawnSession) -> Result<Session, EngineError> {
        let tmux_name = if params.provider.has_pane() {
            let base = if params.friendly_name.is_empty() {
                params.provider.to_string()
            } else {
                params.friendly_name.clone()
            };
            let name = generate_pane_name(&base);
            let command = params.command.clone().unwrap_or_else(|| {
                match params.provider {
                    Provider::ClaudeTmux => "claude",
                    Provider::CodexTmux | Provider::CodexApp => "codex",
                }
                .to_string()
            });
            let pane = self
                .terminal
                .spawn(&name, &params.working_dir, &command, &[])
                .await?;

            // Always-on pipe-log; referenced by handoff wake messages
            let log_path = self.config.pipe_log_dir.join(format!("{pane}.log"));
            if let Err(e) = self.terminal.pipe_log(&pane, &log_path).await {
                warn!(pane, error = %e, "pipe-log setup failed (non-fatal)");
            }
            Some(pane)
        } else {
            None
        };

        let session = self.registry.create(CreateSession {
            provider: params.provider,
            working_dir: params.working_dir,
            parent_id: params.parent_id,
            friendly_name: params.friendly_name,
            is_em: params.is_em,
            tmux_name,
            context_monitor_enabled: params.context_monitor_enabled,
        });
        info!(session_id = %session.id, provider = %session.provider, "session created");
        Ok(session)
    }

    /// Kill a session: terminal teardown, STOPPED status, and cancellation
    /// of its reminders, watchers, and queued messages.
    pub async fn kill_session(&self, identifier: &str) -> Result<Session, EngineError> {
        let session = self.registry.resolve(identifier)?;
        let id = session.id.as_str();

        if let Some(pane) = &session.tmux_name {
            if let Err(e) = self.terminal.kill(pane).await {
                warn!(session_id = id, error = %e, "pane kill failed (continuing)");
            }
        }

        self.registry.mark_stopped(id);
        self.reminders.cancel(id);
        self.watchers.cancel_for(id);
        let purged = self.queue.purge_target(id)?;
        if purged > 0 {
            info!(session_id = id, purged, "dropped queued messages for killed session");
        }
        // Killed senders can no longer act on their context notices either
        let _ = self.queue.cancel_context_monitor_from(id);
        self.tracker.remove(id);

        info!(session_id = id, "session killed");
        Ok(session)
    }

    // ---------------------------------------------------------------------
    // Messaging
    // ---------------------------------------------------------------------

    /// Enqueue input to a session, with optional reminder/wake registration
    /// and stop notification.
    pub async fn send_input(&self, input: SendInput) -> Result<QueuedMessage, EngineError> {
        let target = self.registry.resolve(&input.target)?;
        let target_id = target.id.clone();

        if input.notify_on_stop {
            if let Some(sender) = &input.sender {
                self.tracker.set_stop_notify(target_id.as_str(), sender.clone());
            }
        }
        if let Some(sender) = &input.sender {
            self.tracker
                .set_last_outgoing(sender.as_str(), target_id.clone());
        }

        let row = self
            .delivery
            .enqueue(NewMessage {
                target_id: target_id.clone(),
                sender_id: input.sender.clone(),
                parent_id: input.parent_id.clone(),
                text: input.text,
                mode: input.mode,
                category: None,
            })
            .await?;

        // Dispatch-mode extras: reminder thresholds and the parent wake
        if input.remind_soft.is_some() || input.remind_hard.is_some() {
            self.reminders.register_remind(
                &target_id,
                input.parent_id.clone(),
                input.remind_soft,
                input.remind_hard,
            );
        }
        if let Some(parent) = &input.parent_id {
            self.reminders.register_wake(&target_id, parent);
        }

        Ok(row)
    }

    /// Register a one-shot idle watch.
    pub fn watch(
        &self,
        target: &str,
        observer: &str,
        timeout: Duration,
    ) -> Result<(), EngineError> {
        let target = self.registry.resolve(target)?;
        let observer = self.registry.resolve(observer)?;
        self.watchers.watch(
            &self.delivery,
            &self.registry,
            &self.tracker,
            &self.config,
            target.id.as_str(),
            observer.id.as_str(),
            timeout,
        );
        Ok(())
    }

    /// The durable message queue (shared with the handoff coordinator).
    pub(crate) fn queue(&self) -> &Arc<MessageQueue> {
        &self.queue
    }

    /// The terminal driver (shared with the handoff coordinator).
    pub(crate) fn terminal(&self) -> &T {
        &self.terminal
    }

    /// Low-level named key injection (the urgent/escape path at driver level).
    pub async fn send_key(&self, identifier: &str, key: &str) -> Result<(), EngineError> {
        let session = self.registry.resolve(identifier)?;
        let pane = session.tmux_name.as_deref().ok_or_else(|| {
            EngineError::InvalidState(format!("session {} has no pane", session.id))
        })?;
        Ok(self.terminal.send_key(pane, key).await?)
    }

    /// Last N pane lines for a session.
    pub async fn output(&self, identifier: &str, lines: u32) -> Result<String, EngineError> {
        let session = self.registry.resolve(identifier)?;
        let pane = session.tmux_name.as_deref().ok_or_else(|| {
            EngineError::InvalidState(format!("session {} has no pane", session.id))
        })?;
        Ok(self.terminal.capture_last(pane, lines).await?)
    }

    // ---------------------------------------------------------------------
    // Signals
    // ---------------------------------------------------------------------

    /// Explicit activity RPC (codex_app turn lifecycle).
    pub fn activity(&self, identifier: &str, active: bool) -> Result<(), EngineError> {
        let session = self.registry.resolve(identifier)?;
        let id = session.id.as_str();
        if active {
            self.tracker.mark_active(id);
            self.registry.update_status(id, SessionStatus::Running)?;
        } else {
            self.on_idle_signal(&session, None);
        }
        Ok(())
    }

    /// Explicit agent status update: records the text and resets reminders.
    pub fn agent_status_update(&self, identifier: &str, status: &str) -> Result<(), EngineError> {
        let session = self.registry.resolve(identifier)?;
        self.registry.set_agent_status(session.id.as_str(), status);
        self.reminders.status_update(session.id.as_str());
        Ok(())
    }

    /// Route a hook payload. Unknown sessions and unknown events are
    /// ignored — hooks are fired by agents we may have already forgotten.
    pub async fn handle_hook(&self, payload: HookPayload) -> Result<(), EngineError> {
        let session = self.session_for_hook(&payload);
        let Some(session) = session else {
            debug!(event = %payload.event, "hook for unknown session, ignoring");
            return Ok(());
        };
        let Some(kind) = payload.kind() else {
            debug!(event = %payload.event, "unrecognized hook event, ignoring");
            return Ok(());
        };
        let id = session.id.as_str();

        match kind {
            HookEventKind::PreToolUse => {
                if let Some(tool) = &payload.tool_name {
                    self.registry.record_tool_call(id, tool);
                }
                self.tracker.mark_active(id);
            }
            HookEventKind::PostToolUse => {
                if let Some(tool) = &payload.tool_name {
                    self.registry.record_tool_call(id, tool);
                    if let Err(e) = self.tooluse.record(&ToolUseEntry {
                        session_id: id.to_string(),
                        tool_name: tool.clone(),
                        detail: payload.tool_detail(),
                        at_ms: sesh_core::epoch_ms_now(),
                    }) {
                        warn!(session_id = id, error = %e, "tool-use record failed");
                    }
                }
                self.tracker.mark_active(id);
                let _ = self.registry.update_status(id, SessionStatus::Running);
            }
            HookEventKind::Stop | HookEventKind::Notification => {
                let response = match (&payload.transcript_path, kind) {
                    (Some(path), HookEventKind::Stop) if session.provider.has_hooks() => {
                        self.tracker
                            .read_stop_response(id, Path::new(path))
                            .await
                    }
                    _ => None,
                };
                self.handle_stop_signal(&session, response).await;
            }
            HookEventKind::ContextUsage => {
                self.handle_context_usage(&session, &payload).await;
            }
            HookEventKind::Compaction => {
                info!(session_id = id, "compaction started");
                self.registry.set_compacting(id, true);
            }
            HookEventKind::CompactionComplete => {
                info!(session_id = id, "compaction complete");
                self.registry.set_compacting(id, false);
                // A fresh context deserves a fresh reminder clock
                self.reminders.status_update(id);
            }
            HookEventKind::ContextReset => {
                self.registry.set_context_flags(id, false, false);
                let cancelled = self.queue.cancel_context_monitor_from(id)?;
                if cancelled > 0 {
                    info!(session_id = id, cancelled, "context notices cancelled on reset");
                }
                self.reminders.cancel(id);
            }
            HookEventKind::SessionStart => {
                self.tracker.mark_active(id);
                let _ = self.registry.update_status(id, SessionStatus::Running);
            }
        }
        Ok(())
    }

    /// Route a stop signal through the fence and handoff branch.
    pub async fn handle_stop_signal(&self, session: &Session, response: Option<String>) {
        let id = session.id.as_str();
        match self.tracker.on_stop_signal(id) {
            StopSignalOutcome::Absorbed => {
                // Status is deliberately NOT downgraded: a late clear hook
                // must not mark a re-dispatched task idle.
                debug!(session_id = id, "stop signal absorbed by skip fence");
            }
            StopSignalOutcome::Handoff { continuation, dump } => {
                let text = self.wake_message(session, &continuation, dump.as_deref());
                match self
                    .delivery
                    .enqueue(
                        NewMessage::to(id, text).mode(DeliveryMode::Important),
                    )
                    .await
                {
                    Ok(_) => info!(session_id = id, "handoff wake message enqueued"),
                    Err(e) => warn!(session_id = id, error = %e, "wake message enqueue failed"),
                }
                // The pane sits at a fresh prompt after /clear; flush now
                // rather than waiting for another idle signal.
                self.delivery.spawn_flush(id);
            }
            StopSignalOutcome::Idle => self.on_idle_signal(session, response),
        }
    }

    /// Genuine idle transition: status, reminder cancellation, stop
    /// notifications, and the queue flush.
    fn on_idle_signal(&self, session: &Session, response: Option<String>) {
        let id = session.id.as_str();
        self.tracker.mark_idle(id);
        let _ = self.registry.update_status(id, SessionStatus::Idle);
        self.reminders.cancel(id);

        if let Some(notify) = self.tracker.take_stop_notify(id) {
            let text = match &response {
                Some(r) => format!(
                    "Session {} finished. Last response:\n{}",
                    session.display_name(),
                    truncate(r, 1500)
                ),
                None => format!("Session {} finished.", session.display_name()),
            };
            let delivery = Arc::clone(&self.delivery);
            let msg = NewMessage::to(notify.as_str(), text);
            tokio::spawn(async move {
                if let Err(e) = delivery.enqueue(msg).await {
                    warn!(error = %e, "stop notification enqueue failed");
                }
            });
        }

        let notice_text = match &response {
            Some(r) => format!("{} is idle: {}", session.display_name(), truncate(r, 500)),
            None => format!("{} is idle.", session.display_name()),
        };
        self.notice(session, notice_text);

        self.delivery.spawn_flush(id);
    }

    async fn handle_context_usage(&self, session: &Session, payload: &HookPayload) {
        let id = session.id.as_str();
        let Some(used) = payload.tokens_used else {
            return;
        };
        let window = payload.context_window.unwrap_or(session.context_window);
        self.registry.set_tokens(id, used, window);

        if !session.context_monitor_enabled || window == 0 {
            return;
        }
        let pct = used.saturating_mul(100) / window;

        // One-shot per threshold; flags reset on context_reset
        let fire_warning = pct >= CONTEXT_WARN_PCT && !session.context_warning_sent;
        let fire_critical = pct >= CONTEXT_CRIT_PCT && !session.context_critical_sent;
        if !fire_warning && !fire_critical {
            return;
        }
        self.registry.set_context_flags(
            id,
            session.context_warning_sent || fire_warning,
            session.context_critical_sent || fire_critical,
        );

        // Notices go to the parent when there is one, otherwise the EM
        let recipient = session
            .parent_id
            .clone()
            .or_else(|| self.registry.em_session().map(|em| em.id))
            .filter(|r| r.as_str() != id);
        let Some(recipient) = recipient else {
            return;
        };

        let text = if fire_critical {
            format!(
                "Context critical: {} is at {}% of its window. Hand off now to avoid truncation.",
                session.display_name(),
                pct
            )
        } else {
            format!(
                "Context warning: {} is at {}% of its window. Consider a handoff soon.",
                session.display_name(),
                pct
            )
        };

        if let Err(e) = self
            .delivery
            .enqueue(
                NewMessage::to(recipient.as_str(), text)
                    .mode(DeliveryMode::Important)
                    .from_sender(id)
                    .category(CONTEXT_MONITOR),
            )
            .await
        {
            warn!(session_id = id, error = %e, "context notice enqueue failed");
        }
    }

    fn session_for_hook(&self, payload: &HookPayload) -> Option<Session> {
        if let Some(id) = &payload.session_id {
            if let Ok(session) = self.registry.resolve(id) {
                return Some(session);
            }
        }
        // Fall back to matching by transcript path
        payload
            .transcript_path
            .as_deref()
            .and_then(|path| self.registry.find_by_transcript(path))
    }

    fn notice(&self, session: &Session, text: String) {
        if let Some(tx) = &self.notice_tx {
            let _ = tx.try_send(Notice {
                session_id: session.id.as_str().to_string(),
                text,
            });
        }
    }

    // ---------------------------------------------------------------------
    // Recovery and background inspection
    // ---------------------------------------------------------------------

    /// Startup reconciliation: sessions whose pane is gone become STOPPED,
    /// and queued messages whose target no longer exists are discarded.
    pub async fn recover(&self) -> Result<(), EngineError> {
        for session in self.registry.list() {
            if session.is_stopped() {
                continue;
            }
            let Some(pane) = &session.tmux_name else {
                continue;
            };
            let alive = self.terminal.exists(pane).await.unwrap_or(false);
            if !alive {
                info!(session_id = %session.id, pane, "pane gone at recovery, marking stopped");
                self.registry.mark_stopped(session.id.as_str());
            }
        }

        for target in self.queue.targets_with_pending()? {
            let keep = self
                .registry
                .get(&target)
                .map(|s| !s.is_stopped())
                .unwrap_or(false);
            if !keep {
                let purged = self.queue.purge_target(&target)?;
                warn!(target, purged, "discarded queued messages for missing target");
            }
        }
        Ok(())
    }

    /// Background prompt inspection for providers without hooks.
    ///
    /// Only codex_tmux panes are inspected: claude_tmux has stop hooks, and
    /// inspecting its pane during a handoff would drain the skip fence with
    /// spurious idle sightings.
    pub fn spawn_prompt_inspector(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let runtime = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(runtime.config.watch_poll).await;
                for session in runtime.registry.list() {
                    if session.provider != Provider::CodexTmux || session.is_stopped() {
                        continue;
                    }
                    let Some(pane) = session.tmux_name.clone() else {
                        continue;
                    };
                    let Some(glyph) = session.provider.prompt_glyph() else {
                        continue;
                    };
                    let capture = match runtime.terminal.capture_last(&pane, 40).await {
                        Ok(c) => c,
                        Err(_) => continue,
                    };
                    let idle_now = pane_shows_idle(glyph, &capture);
                    let was_idle = runtime.tracker.is_idle(session.id.as_str());
                    if idle_now && !was_idle {
                        runtime.handle_stop_signal(&session, None).await;
                    } else if !idle_now && was_idle {
                        runtime.tracker.mark_active(session.id.as_str());
                        let _ = runtime
                            .registry
                            .update_status(session.id.as_str(), SessionStatus::Running);
                    }
                }
            }
        })
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &s[..end])
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
