// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local HTTP control plane.
//!
//! Bound to loopback; no authentication (local trust). Also carries the
//! hook sink that agents call back into on tool-use, stop, and context
//! events.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use sesh_adapters::TerminalAdapter;
use sesh_core::{DeliveryMode, HookPayload, Session, SessionId};
use sesh_engine::runtime::{SendInput, SpawnSession};
use sesh_engine::{EngineError, Runtime};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

/// Build the control-plane router.
pub fn router<T: TerminalAdapter>(runtime: Arc<Runtime<T>>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sessions", post(create_session::<T>).get(list_sessions::<T>))
        .route(
            "/sessions/{id}",
            get(show_session::<T>).delete(kill_session::<T>),
        )
        .route("/sessions/{id}/input", post(session_input::<T>))
        .route("/sessions/{id}/key", post(session_key::<T>))
        .route("/sessions/{id}/handoff", post(session_handoff::<T>))
        .route("/sessions/{id}/activity", post(session_activity::<T>))
        .route("/sessions/{id}/status", post(session_status::<T>))
        .route("/sessions/{id}/output", get(session_output::<T>))
        .route("/hooks/{provider}", post(hook_sink::<T>))
        .route("/watch", post(create_watch::<T>))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(runtime)
}

/// API error envelope: structured JSON for programmatic callers.
struct ApiError(EngineError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::Ambiguous(_) | EngineError::InvalidState(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        Self(e)
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn session_json(session: &Session) -> Value {
    json!({
        "id": session.id.as_str(),
        "provider": session.provider.to_string(),
        "tmux_name": session.tmux_name,
        "parent_id": session.parent_id.as_ref().map(|p| p.as_str()),
        "working_dir": session.working_dir,
        "friendly_name": session.friendly_name,
        "status": session.status.to_string(),
        "created_at_ms": session.created_at_ms,
        "last_activity_ms": session.last_activity_ms,
        "last_tool_call": session.last_tool_call_ms,
        "last_tool_name": session.last_tool_name,
        "tokens_used": session.tokens_used,
        "context_window": session.context_window,
        "context_monitor_enabled": session.context_monitor_enabled,
        "agent_status": session.agent_status,
        "is_em": session.is_em,
    })
}

#[derive(Debug, Deserialize)]
struct CreateSessionBody {
    provider: String,
    working_dir: PathBuf,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    parent_id: Option<String>,
    #[serde(default)]
    friendly_name: Option<String>,
    #[serde(default)]
    is_em: bool,
    #[serde(default)]
    context_monitor_enabled: bool,
}

async fn create_session<T: TerminalAdapter>(
    State(runtime): State<Arc<Runtime<T>>>,
    Json(body): Json<CreateSessionBody>,
) -> Result<Json<Value>, ApiError> {
    let provider = body
        .provider
        .parse()
        .map_err(EngineError::InvalidState)?;
    let session = runtime
        .create_session(SpawnSession {
            provider,
            working_dir: body.working_dir,
            command: body.command,
            parent_id: body.parent_id.map(SessionId::new),
            friendly_name: body.friendly_name.unwrap_or_default(),
            is_em: body.is_em,
            context_monitor_enabled: body.context_monitor_enabled,
        })
        .await?;
    Ok(Json(json!({ "id": session.id.as_str() })))
}

async fn list_sessions<T: TerminalAdapter>(
    State(runtime): State<Arc<Runtime<T>>>,
) -> Json<Value> {
    let sessions: Vec<Value> = runtime.registry.list().iter().map(session_json).collect();
    Json(json!({ "sessions": sessions }))
}

async fn show_session<T: TerminalAdapter>(
    State(runtime): State<Arc<Runtime<T>>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let session = runtime.registry.resolve(&id)?;
    Ok(Json(session_json(&session)))
}

async fn kill_session<T: TerminalAdapter>(
    State(runtime): State<Arc<Runtime<T>>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let session = runtime.kill_session(&id).await?;
    Ok(Json(json!({ "id": session.id.as_str(), "status": "stopped" })))
}

#[derive(Debug, Deserialize)]
struct InputBody {
    text: String,
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    sender_id: Option<String>,
    #[serde(default)]
    remind_soft_s: Option<u64>,
    #[serde(default)]
    remind_hard_s: Option<u64>,
    #[serde(default)]
    parent_id: Option<String>,
    #[serde(default)]
    notify_on_stop: bool,
}

async fn session_input<T: TerminalAdapter>(
    State(runtime): State<Arc<Runtime<T>>>,
    Path(id): Path<String>,
    Json(body): Json<InputBody>,
) -> Result<Json<Value>, ApiError> {
    let mode: DeliveryMode = match body.mode.as_deref() {
        Some(m) => m.parse().map_err(EngineError::InvalidState)?,
        None => DeliveryMode::Sequential,
    };
    let row = runtime
        .send_input(SendInput {
            target: id,
            text: body.text,
            mode,
            sender: body.sender_id.map(SessionId::new),
            remind_soft: body.remind_soft_s.map(Duration::from_secs),
            remind_hard: body.remind_hard_s.map(Duration::from_secs),
            parent_id: body.parent_id.map(SessionId::new),
            notify_on_stop: body.notify_on_stop,
        })
        .await?;
    Ok(Json(json!({ "message_id": row.id, "queued_at_ms": row.queued_at_ms })))
}

#[derive(Debug, Deserialize)]
struct KeyBody {
    key: String,
}

async fn session_key<T: TerminalAdapter>(
    State(runtime): State<Arc<Runtime<T>>>,
    Path(id): Path<String>,
    Json(body): Json<KeyBody>,
) -> Result<Json<Value>, ApiError> {
    runtime.send_key(&id, &body.key).await?;
    Ok(Json(json!({ "sent": body.key })))
}

#[derive(Debug, Deserialize)]
struct HandoffBody {
    continuation_path: PathBuf,
}

async fn session_handoff<T: TerminalAdapter>(
    State(runtime): State<Arc<Runtime<T>>>,
    Path(id): Path<String>,
    Json(body): Json<HandoffBody>,
) -> Result<Json<Value>, ApiError> {
    runtime.handoff(&id, body.continuation_path).await?;
    Ok(Json(json!({ "status": "handoff_started" })))
}

#[derive(Debug, Deserialize)]
struct ActivityBody {
    active: bool,
}

async fn session_activity<T: TerminalAdapter>(
    State(runtime): State<Arc<Runtime<T>>>,
    Path(id): Path<String>,
    Json(body): Json<ActivityBody>,
) -> Result<Json<Value>, ApiError> {
    runtime.activity(&id, body.active)?;
    Ok(Json(json!({ "active": body.active })))
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: String,
}

async fn session_status<T: TerminalAdapter>(
    State(runtime): State<Arc<Runtime<T>>>,
    Path(id): Path<String>,
    Json(body): Json<StatusBody>,
) -> Result<Json<Value>, ApiError> {
    runtime.agent_status_update(&id, &body.status)?;
    Ok(Json(json!({ "status": "recorded" })))
}

#[derive(Debug, Deserialize)]
struct OutputQuery {
    #[serde(default = "default_lines")]
    lines: u32,
}

fn default_lines() -> u32 {
    40
}

async fn session_output<T: TerminalAdapter>(
    State(runtime): State<Arc<Runtime<T>>>,
    Path(id): Path<String>,
    Query(query): Query<OutputQuery>,
) -> Result<Json<Value>, ApiError> {
    let raw = runtime.output(&id, query.lines).await?;
    Ok(Json(json!({ "output": strip_ansi(&raw) })))
}

async fn hook_sink<T: TerminalAdapter>(
    State(runtime): State<Arc<Runtime<T>>>,
    Path(provider): Path<String>,
    Json(payload): Json<HookPayload>,
) -> Result<Json<Value>, ApiError> {
    debug!(provider, event = %payload.event, "hook received");
    runtime.handle_hook(payload).await?;
    Ok(Json(json!({ "status": "ok" })))
}

#[derive(Debug, Deserialize)]
struct WatchBody {
    target: String,
    observer: String,
    timeout_s: u64,
}

async fn create_watch<T: TerminalAdapter>(
    State(runtime): State<Arc<Runtime<T>>>,
    Json(body): Json<WatchBody>,
) -> Result<Json<Value>, ApiError> {
    runtime.watch(
        &body.target,
        &body.observer,
        Duration::from_secs(body.timeout_s),
    )?;
    Ok(Json(json!({ "status": "watching" })))
}

static ANSI_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]|\x1b\][^\x07]*\x07")
        .expect("constant regex pattern is valid")
});

/// Strip ANSI escape sequences from captured pane output.
pub fn strip_ansi(s: &str) -> String {
    ANSI_RE.replace_all(s, "").into_owned()
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
