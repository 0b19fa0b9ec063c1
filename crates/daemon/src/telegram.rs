// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote-operator chat bridge.
//!
//! Inbound: long-polls the gateway for updates and routes thread messages
//! into the matching session's queue. Outbound: relays engine notices into
//! the EM's inherited forum thread. The poll loop is watched by a health
//! monitor because a silently stalled TCP connection does not trip
//! per-chunk timeouts while keepalive traffic flows.

use parking_lot::Mutex;
use sesh_adapters::{chat::ChatGateway, ChatUpdate, TerminalAdapter};
use sesh_core::{DeliveryMode, EmTopic, NewMessage, Session};
use sesh_engine::{Notice, Runtime};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Bridge between the orchestration core and the remote chat.
pub struct ChatBridge<T: TerminalAdapter, G: ChatGateway> {
    runtime: Arc<Runtime<T>>,
    gateway: G,
    chat_id: i64,
    /// Last successful poll round-trip, shared with the health monitor
    last_round_trip: Arc<Mutex<Instant>>,
}

impl<T: TerminalAdapter, G: ChatGateway> ChatBridge<T, G> {
    pub fn new(runtime: Arc<Runtime<T>>, gateway: G, chat_id: i64) -> Self {
        Self {
            runtime,
            gateway,
            chat_id,
            last_round_trip: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Adopt or create the EM topic for a newly created EM session.
    ///
    /// The registry stores the latest EM's topic; a new EM session deletes
    /// its freshly created thread and inherits the prior one, so threads
    /// are not created without bound. Fail-open: any error leaves the
    /// session with a usable thread.
    pub async fn bind_em_topic(&self, session: &Session) {
        let id = session.id.as_str();
        if let Some(topic) = self.runtime.registry.em_topic() {
            if topic.chat_id == self.chat_id {
                info!(session_id = id, thread_id = topic.thread_id, "adopting inherited EM topic");
                self.runtime.registry.set_chat_thread(id, Some(topic.thread_id));
                return;
            }
        }

        match self
            .gateway
            .create_topic(self.chat_id, &format!("EM {}", session.display_name()))
            .await
        {
            Ok(thread_id) => {
                self.runtime.registry.set_chat_thread(id, Some(thread_id));
                self.runtime.registry.set_em_topic(Some(EmTopic {
                    chat_id: self.chat_id,
                    thread_id,
                }));
            }
            Err(e) => {
                // Fail-open: plain chat still works without a thread
                warn!(session_id = id, error = %e, "EM topic creation failed");
            }
        }
    }

    /// Create a forum thread for a non-EM session (one thread per session).
    pub async fn bind_session_topic(&self, session: &Session) {
        let id = session.id.as_str();
        match self
            .gateway
            .create_topic(self.chat_id, session.display_name())
            .await
        {
            Ok(thread_id) => self.runtime.registry.set_chat_thread(id, Some(thread_id)),
            Err(e) => warn!(session_id = id, error = %e, "session topic creation failed"),
        }
    }

    /// Drain engine notices into the chat.
    pub async fn run_outbound(self: Arc<Self>, mut notice_rx: mpsc::Receiver<Notice>) {
        while let Some(Notice { session_id, text }) = notice_rx.recv().await {
            let thread = self
                .runtime
                .registry
                .get(&session_id)
                .and_then(|s| s.chat_thread_id);
            if let Err(e) = self.gateway.send(self.chat_id, thread, &text).await {
                warn!(session_id, error = %e, "notice relay failed");
            }
        }
    }

    /// Inbound long-poll loop with the stall watchdog.
    ///
    /// The poll offset lives outside the poller task so a restart resumes
    /// where the last acknowledged update left off.
    pub async fn run_inbound(self: Arc<Self>) {
        let offset = Arc::new(AtomicI64::new(0));
        let poll_timeout = sesh_adapters::env::chat_poll_timeout();
        let health_threshold = sesh_adapters::env::chat_health_threshold();

        loop {
            *self.last_round_trip.lock() = Instant::now();
            let bridge = Arc::clone(&self);
            let poll_offset = Arc::clone(&offset);
            let mut poller = tokio::spawn(async move {
                loop {
                    let current = poll_offset.load(Ordering::SeqCst);
                    match bridge.gateway.poll_updates(current, poll_timeout).await {
                        Ok(updates) => {
                            *bridge.last_round_trip.lock() = Instant::now();
                            for update in updates {
                                poll_offset.fetch_max(update.update_id + 1, Ordering::SeqCst);
                                bridge.route_update(update).await;
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "chat poll failed, backing off");
                            tokio::time::sleep(std::time::Duration::from_secs(2)).await;
                        }
                    }
                }
            });

            // Watchdog: no round-trip within the threshold means a silent
            // TCP stall — kill the poller and start a fresh connection.
            loop {
                tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                if poller.is_finished() {
                    break;
                }
                let stalled = self.last_round_trip.lock().elapsed() > health_threshold;
                if stalled {
                    warn!("chat poll stalled past health threshold, restarting poller");
                    poller.abort();
                    break;
                }
            }
            let _ = (&mut poller).await;
        }
    }

    /// Route one inbound update to the session owning its thread.
    async fn route_update(&self, update: ChatUpdate) {
        if update.chat_id != self.chat_id {
            return;
        }

        let target = match update.thread_id {
            Some(thread) => self
                .runtime
                .registry
                .list()
                .into_iter()
                .find(|s| s.chat_thread_id == Some(thread) && !s.is_stopped()),
            None => self.runtime.registry.em_session(),
        };

        let Some(target) = target else {
            warn!(thread_id = ?update.thread_id, "inbound chat message with no live session");
            return;
        };

        if let Err(e) = self
            .runtime
            .delivery
            .enqueue(
                NewMessage::to(target.id.as_str(), update.text).mode(DeliveryMode::Sequential),
            )
            .await
        {
            warn!(target = %target.id, error = %e, "inbound chat enqueue failed");
        }
    }
}

#[cfg(test)]
#[path = "telegram_tests.rs"]
mod tests;
