// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote-chat gateway adapters (Telegram)

mod telegram;

pub use telegram::TelegramGateway;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeChatGateway;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors from gateway operations
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("api error: {0}")]
    Api(String),
    /// The forum thread no longer exists (deleted or closed)
    #[error("thread gone: {0}")]
    ThreadGone(i64),
}

/// One inbound update from the remote operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatUpdate {
    /// Monotonic update id, used as the long-poll offset
    pub update_id: i64,
    pub chat_id: i64,
    /// Forum thread the message was posted in, if any
    pub thread_id: Option<i64>,
    pub reply_to: Option<i64>,
    pub text: String,
}

/// Adapter for the remote operator chat.
///
/// Outbound sends fall back to the plain chat when the target thread has
/// been closed; the caller decides whether to clear its stored thread id.
#[async_trait]
pub trait ChatGateway: Clone + Send + Sync + 'static {
    /// Send text to a chat, optionally into a forum thread.
    async fn send(
        &self,
        chat_id: i64,
        thread_id: Option<i64>,
        text: &str,
    ) -> Result<(), GatewayError>;

    /// Create a forum topic; returns its thread id.
    async fn create_topic(&self, chat_id: i64, name: &str) -> Result<i64, GatewayError>;

    /// Delete a forum topic.
    async fn delete_topic(&self, chat_id: i64, thread_id: i64) -> Result<(), GatewayError>;

    /// Long-poll for updates after `offset`. The implementation must bound
    /// the whole request with `timeout` — silent TCP stalls are handled by
    /// the caller's health monitor, not by per-chunk timeouts.
    async fn poll_updates(
        &self,
        offset: i64,
        timeout: Duration,
    ) -> Result<Vec<ChatUpdate>, GatewayError>;
}
