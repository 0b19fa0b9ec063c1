// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot idle watchers.
//!
//! A watch notifies an observer session once when its target goes idle, or
//! when the timeout elapses. Fresh watches mark the target active first —
//! a target that was already idle at watch time would otherwise resolve
//! immediately and notify spuriously.

use crate::config::EngineConfig;
use crate::delivery::DeliveryEngine;
use crate::registry::SessionRegistry;
use crate::tracker::IdleTracker;
use parking_lot::Mutex;
use sesh_adapters::TerminalAdapter;
use sesh_core::{DeliveryMode, NewMessage, Provider, SessionStatus};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{info, warn};

pub struct WatcherSet {
    watchers: Mutex<HashMap<u64, WatchHandle>>,
    next_id: AtomicU64,
}

struct WatchHandle {
    target: String,
    _shutdown: oneshot::Sender<()>,
}

impl Default for WatcherSet {
    fn default() -> Self {
        Self::new()
    }
}

impl WatcherSet {
    pub fn new() -> Self {
        Self {
            watchers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a one-shot watch on `target`, notifying `observer`.
    pub fn watch<T: TerminalAdapter>(
        self: &Arc<Self>,
        delivery: &Arc<DeliveryEngine<T>>,
        registry: &Arc<SessionRegistry>,
        tracker: &Arc<IdleTracker>,
        config: &Arc<EngineConfig>,
        target: &str,
        observer: &str,
        timeout: Duration,
    ) {
        // A pre-idle target must not resolve on the first poll
        tracker.mark_active(target);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.watchers.lock().insert(
            id,
            WatchHandle {
                target: target.to_string(),
                _shutdown: shutdown_tx,
            },
        );

        let watchers = Arc::clone(self);
        let delivery = Arc::clone(delivery);
        let registry = Arc::clone(registry);
        let tracker = Arc::clone(tracker);
        let config = Arc::clone(config);
        let target = target.to_string();
        let observer = observer.to_string();

        tokio::spawn(async move {
            watch_task(WatchTask {
                id,
                watchers,
                delivery,
                registry,
                tracker,
                config,
                target,
                observer,
                timeout,
                shutdown_rx,
            })
            .await;
        });
    }

    /// Cancel all watches on a target (target killed).
    pub fn cancel_for(&self, target: &str) {
        self.watchers.lock().retain(|_, h| h.target != target);
    }

    pub fn count(&self) -> usize {
        self.watchers.lock().len()
    }

    fn deregister(&self, id: u64) {
        self.watchers.lock().remove(&id);
    }
}

struct WatchTask<T: TerminalAdapter> {
    id: u64,
    watchers: Arc<WatcherSet>,
    delivery: Arc<DeliveryEngine<T>>,
    registry: Arc<SessionRegistry>,
    tracker: Arc<IdleTracker>,
    config: Arc<EngineConfig>,
    target: String,
    observer: String,
    timeout: Duration,
    shutdown_rx: oneshot::Receiver<()>,
}

async fn watch_task<T: TerminalAdapter>(task: WatchTask<T>) {
    let WatchTask {
        id,
        watchers,
        delivery,
        registry,
        tracker,
        config,
        target,
        observer,
        timeout,
        mut shutdown_rx,
    } = task;

    let deadline = tokio::time::Instant::now() + timeout;
    let notification = loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                watchers.deregister(id);
                return;
            }
            _ = tokio::time::sleep(config.watch_poll) => {}
        }

        let Some(session) = registry.get(&target) else {
            // Target removed mid-watch: report as idle (it will never run again)
            break format!("Watched session {} no longer exists.", target);
        };

        // For providers without hooks, external status maintained by the
        // prompt-inspection path is a secondary idle signal.
        let prompt_idle =
            session.provider == Provider::CodexTmux && session.status == SessionStatus::Idle;

        if tracker.is_idle(&target) || prompt_idle || session.is_stopped() {
            break format!("Session {} is now idle.", session.display_name());
        }

        if tokio::time::Instant::now() >= deadline {
            info!(target, observer, "watch timed out");
            break format!(
                "Watch on {} timed out after {}s.",
                session.display_name(),
                timeout.as_secs()
            );
        }
    };

    watchers.deregister(id);

    if let Err(e) = delivery
        .enqueue(NewMessage::to(observer.as_str(), notification).mode(DeliveryMode::Sequential))
        .await
    {
        warn!(target, observer, error = %e, "watch notification enqueue failed");
    }
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;
