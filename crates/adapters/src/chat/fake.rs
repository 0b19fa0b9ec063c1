// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake chat gateway for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ChatGateway, ChatUpdate, GatewayError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// One recorded outbound send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: i64,
    pub thread_id: Option<i64>,
    pub text: String,
}

#[derive(Default)]
struct FakeGatewayState {
    sent: Vec<SentMessage>,
    updates: VecDeque<ChatUpdate>,
    topics: Vec<(i64, String)>,
    next_thread_id: i64,
    dead_threads: Vec<i64>,
}

/// Fake chat gateway recording sends and serving scripted updates.
#[derive(Clone, Default)]
pub struct FakeChatGateway {
    inner: Arc<Mutex<FakeGatewayState>>,
}

impl FakeChatGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.inner.lock().sent.clone()
    }

    /// Script an inbound update for the next poll.
    pub fn push_update(&self, update: ChatUpdate) {
        self.inner.lock().updates.push_back(update);
    }

    /// Mark a thread as deleted so sends into it fail with ThreadGone.
    pub fn kill_thread(&self, thread_id: i64) {
        self.inner.lock().dead_threads.push(thread_id);
    }

    pub fn topics(&self) -> Vec<(i64, String)> {
        self.inner.lock().topics.clone()
    }
}

#[async_trait]
impl ChatGateway for FakeChatGateway {
    async fn send(
        &self,
        chat_id: i64,
        thread_id: Option<i64>,
        text: &str,
    ) -> Result<(), GatewayError> {
        let mut state = self.inner.lock();
        if let Some(thread) = thread_id {
            if state.dead_threads.contains(&thread) {
                // Behave like the real gateway: fall back to the plain chat
                state.sent.push(SentMessage {
                    chat_id,
                    thread_id: None,
                    text: text.to_string(),
                });
                return Ok(());
            }
        }
        state.sent.push(SentMessage {
            chat_id,
            thread_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn create_topic(&self, chat_id: i64, name: &str) -> Result<i64, GatewayError> {
        let mut state = self.inner.lock();
        state.next_thread_id += 1;
        let id = state.next_thread_id;
        state.topics.push((chat_id, name.to_string()));
        Ok(id)
    }

    async fn delete_topic(&self, _chat_id: i64, thread_id: i64) -> Result<(), GatewayError> {
        self.inner.lock().dead_threads.push(thread_id);
        Ok(())
    }

    async fn poll_updates(
        &self,
        offset: i64,
        _timeout: Duration,
    ) -> Result<Vec<ChatUpdate>, GatewayError> {
        let mut state = self.inner.lock();
        let mut out = Vec::new();
        while let Some(front) = state.updates.front() {
            if front.update_id < offset {
                state.updates.pop_front();
                continue;
            }
            match state.updates.pop_front() {
                Some(u) => out.push(u),
                None => break,
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
