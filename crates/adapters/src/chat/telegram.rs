// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Telegram Bot API gateway

use super::{ChatGateway, ChatUpdate, GatewayError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Telegram gateway over the Bot HTTP API.
///
/// Long polls `getUpdates` with a server-side timeout shorter than the
/// request timeout, so a healthy poll always returns before the client
/// deadline fires.
#[derive(Clone)]
pub struct TelegramGateway {
    client: reqwest::Client,
    base: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct RawUpdate {
    update_id: i64,
    #[serde(default)]
    message: Option<RawMessage>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default)]
    text: Option<String>,
    chat: RawChat,
    #[serde(default)]
    message_thread_id: Option<i64>,
    #[serde(default)]
    reply_to_message: Option<Box<RawReply>>,
}

#[derive(Debug, Deserialize)]
struct RawChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct RawReply {
    message_id: i64,
}

#[derive(Debug, Deserialize)]
struct RawTopic {
    message_thread_id: i64,
}

impl TelegramGateway {
    pub fn new(token: &str) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base: format!("https://api.telegram.org/bot{}", token),
        })
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
        timeout: Duration,
    ) -> Result<T, GatewayError> {
        let url = format!("{}/{}", self.base, method);
        let resp = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let parsed: ApiResponse<T> = resp
            .json()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !parsed.ok {
            let description = parsed.description.unwrap_or_else(|| "unknown".to_string());
            return Err(api_error_from(description));
        }

        parsed
            .result
            .ok_or_else(|| GatewayError::Api("missing result".to_string()))
    }
}

const CALL_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
impl ChatGateway for TelegramGateway {
    async fn send(
        &self,
        chat_id: i64,
        thread_id: Option<i64>,
        text: &str,
    ) -> Result<(), GatewayError> {
        let mut body = json!({ "chat_id": chat_id, "text": text });
        if let Some(thread) = thread_id {
            body["message_thread_id"] = json!(thread);
        }

        match self
            .call::<serde_json::Value>("sendMessage", body, CALL_TIMEOUT)
            .await
        {
            Ok(_) => Ok(()),
            Err(GatewayError::ThreadGone(_)) if thread_id.is_some() => {
                // Opportunistic fallback: the thread was closed, post to the
                // plain chat so the message is not lost.
                tracing::warn!(chat_id, ?thread_id, "thread gone, falling back to chat");
                self.call::<serde_json::Value>(
                    "sendMessage",
                    json!({ "chat_id": chat_id, "text": text }),
                    CALL_TIMEOUT,
                )
                .await
                .map(|_| ())
            }
            Err(e) => Err(e),
        }
    }

    async fn create_topic(&self, chat_id: i64, name: &str) -> Result<i64, GatewayError> {
        let topic: RawTopic = self
            .call(
                "createForumTopic",
                json!({ "chat_id": chat_id, "name": name }),
                CALL_TIMEOUT,
            )
            .await?;
        Ok(topic.message_thread_id)
    }

    async fn delete_topic(&self, chat_id: i64, thread_id: i64) -> Result<(), GatewayError> {
        self.call::<serde_json::Value>(
            "deleteForumTopic",
            json!({ "chat_id": chat_id, "message_thread_id": thread_id }),
            CALL_TIMEOUT,
        )
        .await
        .map(|_| ())
    }

    async fn poll_updates(
        &self,
        offset: i64,
        timeout: Duration,
    ) -> Result<Vec<ChatUpdate>, GatewayError> {
        // Server-side long-poll timeout is kept below the request timeout
        // so a healthy empty poll returns before the client deadline.
        let server_timeout = timeout.as_secs().saturating_sub(5).max(1);
        let raw: Vec<RawUpdate> = self
            .call(
                "getUpdates",
                json!({
                    "offset": offset,
                    "timeout": server_timeout,
                    "allowed_updates": ["message"],
                }),
                timeout,
            )
            .await?;

        Ok(to_updates(raw))
    }
}

/// Classify a Bot API error description.
///
/// Thread-related failures surface as [`GatewayError::ThreadGone`] so
/// callers can retry without the thread.
fn api_error_from(description: String) -> GatewayError {
    if description.contains("thread not found") || description.contains("TOPIC_DELETED") {
        GatewayError::ThreadGone(0)
    } else {
        GatewayError::Api(description)
    }
}

/// Map raw updates to the gateway shape, dropping non-text updates.
fn to_updates(raw: Vec<RawUpdate>) -> Vec<ChatUpdate> {
    raw.into_iter()
        .filter_map(|u| {
            let message = u.message?;
            let text = message.text?;
            Some(ChatUpdate {
                update_id: u.update_id,
                chat_id: message.chat.id,
                thread_id: message.message_thread_id,
                reply_to: message.reply_to_message.map(|r| r.message_id),
                text,
            })
        })
        .collect()
}

#[cfg(test)]
#[path = "telegram_tests.rs"]
mod tests;
