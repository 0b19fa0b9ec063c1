// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool-usage observability store.
//!
//! Written by hook handlers on every PostToolUse event, read by parent-wake
//! digests and operator dashboards. Kept in its own database file so
//! high-frequency tool telemetry never contends with the message queue.

use crate::queue::QueueError;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;

/// One recorded tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolUseEntry {
    pub session_id: String,
    pub tool_name: String,
    pub detail: Option<String>,
    pub at_ms: u64,
}

/// Append-only tool usage log.
pub struct ToolUsageStore {
    conn: Mutex<Connection>,
}

impl ToolUsageStore {
    pub fn open(path: &Path) -> Result<Self, QueueError> {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let conn = Connection::open(path)?;
        migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, QueueError> {
        let conn = Connection::open_in_memory()?;
        migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn record(&self, entry: &ToolUseEntry) -> Result<(), QueueError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO tool_use (session_id, tool_name, detail, at_ms) \
             VALUES (?1, ?2, ?3, ?4)",
            params![entry.session_id, entry.tool_name, entry.detail, entry.at_ms],
        )?;
        Ok(())
    }

    /// The most recent `n` entries for a session, newest first.
    pub fn last_for(&self, session_id: &str, n: u32) -> Result<Vec<ToolUseEntry>, QueueError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT session_id, tool_name, detail, at_ms FROM tool_use \
             WHERE session_id = ?1 \
             ORDER BY at_ms DESC, id DESC \
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![session_id, n], |row| {
            Ok(ToolUseEntry {
                session_id: row.get(0)?,
                tool_name: row.get(1)?,
                detail: row.get(2)?,
                at_ms: row.get(3)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Drop telemetry for a removed session.
    pub fn purge_session(&self, session_id: &str) -> Result<usize, QueueError> {
        let conn = self.conn.lock();
        let n = conn.execute(
            "DELETE FROM tool_use WHERE session_id = ?1",
            params![session_id],
        )?;
        Ok(n)
    }
}

fn migrate(conn: &Connection) -> Result<(), QueueError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS tool_use (\
            id INTEGER PRIMARY KEY AUTOINCREMENT,\
            session_id TEXT NOT NULL,\
            tool_name TEXT NOT NULL,\
            detail TEXT,\
            at_ms INTEGER NOT NULL\
        );\
        CREATE INDEX IF NOT EXISTS idx_tool_use_session \
            ON tool_use (session_id, at_ms);",
    )?;
    Ok(())
}

#[cfg(test)]
#[path = "tooluse_tests.rs"]
mod tests;
