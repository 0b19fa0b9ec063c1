// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error taxonomy.

use thiserror::Error;

/// Errors surfaced by the orchestration core.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Unknown session id or unresolvable identifier (user-facing, exit 1)
    #[error("session not found: {0}")]
    NotFound(String),

    /// Identifier prefix matches more than one session
    #[error("ambiguous identifier: {0}")]
    Ambiguous(String),

    /// Operation disallowed in the session's current state
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Transient terminal driver failure; callers decide retry vs surface
    #[error("terminal driver: {0}")]
    Driver(#[from] sesh_adapters::TerminalError),

    #[error("queue: {0}")]
    Queue(#[from] sesh_storage::QueueError),

    #[error("snapshot: {0}")]
    Snapshot(#[from] sesh_storage::SnapshotError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Whether the error is the caller's fault (exit code 1 territory).
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            EngineError::NotFound(_) | EngineError::Ambiguous(_) | EngineError::InvalidState(_)
        )
    }
}
