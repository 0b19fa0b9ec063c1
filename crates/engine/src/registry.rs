// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session registry: the authoritative in-memory session table plus its
//! durable snapshot.
//!
//! All mutations go through the registry-wide writer lock and write the
//! snapshot through to disk before returning. Nothing else owns session
//! identity.

use crate::error::EngineError;
use parking_lot::Mutex;
use sesh_core::{
    epoch_ms_now, id::short_session_id, EmTopic, Provider, Session, SessionId, SessionStatus,
};
use sesh_storage::RegistrySnapshot;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::warn;

/// Parameters for creating a session.
#[derive(Debug, Clone)]
pub struct CreateSession {
    pub provider: Provider,
    pub working_dir: PathBuf,
    pub parent_id: Option<SessionId>,
    pub friendly_name: String,
    pub is_em: bool,
    pub tmux_name: Option<String>,
    pub context_monitor_enabled: bool,
}

struct RegistryInner {
    sessions: HashMap<String, Session>,
    em_topic: Option<EmTopic>,
}

/// Authoritative session table with write-through persistence.
pub struct SessionRegistry {
    inner: Mutex<RegistryInner>,
    snapshot_path: PathBuf,
}

impl SessionRegistry {
    /// Open the registry, loading the snapshot if one exists.
    pub fn open(snapshot_path: PathBuf) -> Result<Self, EngineError> {
        let snapshot = RegistrySnapshot::load(&snapshot_path)?.unwrap_or_default();
        let sessions = snapshot
            .sessions
            .into_iter()
            .map(|s| (s.id.as_str().to_string(), s))
            .collect();
        Ok(Self {
            inner: Mutex::new(RegistryInner {
                sessions,
                em_topic: snapshot.em_topic,
            }),
            snapshot_path,
        })
    }

    /// Create a new session record.
    pub fn create(&self, params: CreateSession) -> Session {
        let mut inner = self.inner.lock();

        // 8-hex ids can collide; regenerate until free
        let mut id = short_session_id();
        while inner.sessions.contains_key(&id) {
            id = short_session_id();
        }

        let now = epoch_ms_now();
        let session = Session {
            id: SessionId::new(&id),
            provider: params.provider,
            tmux_name: params.tmux_name,
            parent_id: params.parent_id,
            working_dir: params.working_dir,
            created_at_ms: now,
            friendly_name: params.friendly_name,
            status: SessionStatus::Running,
            last_activity_ms: now,
            last_tool_call_ms: None,
            last_tool_name: None,
            is_em: params.is_em,
            chat_thread_id: None,
            tokens_used: 0,
            context_window: 0,
            context_monitor_enabled: params.context_monitor_enabled,
            agent_status: None,
            agent_status_at_ms: None,
            is_compacting: false,
            context_warning_sent: false,
            context_critical_sent: false,
        };
        inner.sessions.insert(id, session.clone());
        self.persist(&inner);
        session
    }

    pub fn get(&self, id: &str) -> Option<Session> {
        self.inner.lock().sessions.get(id).cloned()
    }

    pub fn list(&self) -> Vec<Session> {
        let inner = self.inner.lock();
        let mut sessions: Vec<_> = inner.sessions.values().cloned().collect();
        sessions.sort_by_key(|s| s.created_at_ms);
        sessions
    }

    /// Resolve an identifier: exact id, unambiguous id prefix, or exact
    /// friendly name.
    pub fn resolve(&self, identifier: &str) -> Result<Session, EngineError> {
        let inner = self.inner.lock();

        if let Some(session) = inner.sessions.get(identifier) {
            return Ok(session.clone());
        }

        let prefix_matches: Vec<_> = inner
            .sessions
            .iter()
            .filter(|(k, _)| k.starts_with(identifier))
            .collect();
        match prefix_matches.len() {
            1 => return Ok(prefix_matches[0].1.clone()),
            n if n > 1 => return Err(EngineError::Ambiguous(identifier.to_string())),
            _ => {}
        }

        let name_matches: Vec<_> = inner
            .sessions
            .values()
            .filter(|s| !s.friendly_name.is_empty() && s.friendly_name == identifier)
            .collect();
        match name_matches.len() {
            1 => Ok(name_matches[0].clone()),
            0 => Err(EngineError::NotFound(identifier.to_string())),
            _ => Err(EngineError::Ambiguous(identifier.to_string())),
        }
    }

    /// Update a session's status. STOPPED is terminal.
    pub fn update_status(&self, id: &str, status: SessionStatus) -> Result<(), EngineError> {
        self.mutate(id, |session| {
            if session.is_stopped() {
                return Err(EngineError::InvalidState(format!(
                    "session {} is stopped",
                    session.id
                )));
            }
            session.status = status;
            Ok(())
        })?
    }

    /// Mark a session stopped (idempotent).
    pub fn mark_stopped(&self, id: &str) {
        let _ = self.mutate(id, |session| {
            session.status = SessionStatus::Stopped;
        });
    }

    pub fn remove(&self, id: &str) -> Option<Session> {
        let mut inner = self.inner.lock();
        let removed = inner.sessions.remove(id);
        if removed.is_some() {
            self.persist(&inner);
        }
        removed
    }

    pub fn touch_activity(&self, id: &str) {
        let _ = self.mutate(id, |session| {
            session.last_activity_ms = epoch_ms_now();
        });
    }

    pub fn record_tool_call(&self, id: &str, tool_name: &str) {
        let _ = self.mutate(id, |session| {
            session.last_tool_call_ms = Some(epoch_ms_now());
            session.last_tool_name = Some(tool_name.to_string());
            session.last_activity_ms = epoch_ms_now();
        });
    }

    pub fn set_agent_status(&self, id: &str, status: &str) {
        let _ = self.mutate(id, |session| {
            session.agent_status = Some(status.to_string());
            session.agent_status_at_ms = Some(epoch_ms_now());
            session.last_activity_ms = epoch_ms_now();
        });
    }

    pub fn set_tokens(&self, id: &str, used: u64, window: u64) {
        let _ = self.mutate(id, |session| {
            session.tokens_used = used;
            if window > 0 {
                session.context_window = window;
            }
        });
    }

    pub fn set_chat_thread(&self, id: &str, thread_id: Option<i64>) {
        let _ = self.mutate(id, |session| {
            session.chat_thread_id = thread_id;
        });
    }

    /// Flip a runtime-only flag. Not persisted beyond the in-memory table,
    /// but routed through the writer lock like everything else.
    pub fn set_compacting(&self, id: &str, compacting: bool) {
        let mut inner = self.inner.lock();
        if let Some(session) = inner.sessions.get_mut(id) {
            session.is_compacting = compacting;
        }
    }

    pub fn set_context_flags(&self, id: &str, warning: bool, critical: bool) {
        let mut inner = self.inner.lock();
        if let Some(session) = inner.sessions.get_mut(id) {
            session.context_warning_sent = warning;
            session.context_critical_sent = critical;
        }
    }

    pub fn em_topic(&self) -> Option<EmTopic> {
        self.inner.lock().em_topic.clone()
    }

    pub fn set_em_topic(&self, topic: Option<EmTopic>) {
        let mut inner = self.inner.lock();
        inner.em_topic = topic;
        self.persist(&inner);
    }

    /// The current EM session, if one is live.
    pub fn em_session(&self) -> Option<Session> {
        self.inner
            .lock()
            .sessions
            .values()
            .find(|s| s.is_em && !s.is_stopped())
            .cloned()
    }

    /// Find a session matching a hook's transcript path. Transcript files
    /// are named after the session id the agent was started with.
    pub fn find_by_transcript(&self, transcript_path: &str) -> Option<Session> {
        self.inner
            .lock()
            .sessions
            .values()
            .find(|s| transcript_path.contains(s.id.as_str()))
            .cloned()
    }

    fn mutate<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut Session) -> T,
    ) -> Result<T, EngineError> {
        let mut inner = self.inner.lock();
        let session = inner
            .sessions
            .get_mut(id)
            .ok_or_else(|| EngineError::NotFound(id.to_string()))?;
        let result = f(session);
        self.persist(&inner);
        Ok(result)
    }

    /// Write-through snapshot. Failure is logged, not fatal: the in-memory
    /// table stays authoritative and the next mutation retries.
    fn persist(&self, inner: &RegistryInner) {
        let snapshot = RegistrySnapshot::new(
            inner.sessions.values().cloned().collect(),
            inner.em_topic.clone(),
        );
        if let Err(e) = snapshot.save(&self.snapshot_path) {
            warn!(error = %e, path = %self.snapshot_path.display(), "snapshot write failed");
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
