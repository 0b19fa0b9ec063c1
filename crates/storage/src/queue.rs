// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable message queue backed by an embedded SQLite database.
//!
//! Rows survive daemon restarts; undelivered messages for live targets
//! re-enter the flush pipeline on the next idle signal. The connection is
//! serialized behind a mutex — round-trips are short and the daemon is a
//! single process.

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use sesh_core::{epoch_ms_now, DeliveryMode, IdGen, NewMessage, QueuedMessage, SessionId, UuidIdGen};
use std::path::Path;
use thiserror::Error;

/// Errors from queue operations
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
}

/// Durable per-target message queue.
pub struct MessageQueue {
    conn: Mutex<Connection>,
    ids: UuidIdGen,
}

impl MessageQueue {
    /// Open (or create) the queue database and run migrations.
    pub fn open(path: &Path) -> Result<Self, QueueError> {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let conn = Connection::open(path)?;
        migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            ids: UuidIdGen,
        })
    }

    /// In-memory queue for tests.
    pub fn open_in_memory() -> Result<Self, QueueError> {
        let conn = Connection::open_in_memory()?;
        migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            ids: UuidIdGen,
        })
    }

    /// Insert a message; returns the stored row.
    pub fn enqueue(&self, msg: NewMessage) -> Result<QueuedMessage, QueueError> {
        let stored = QueuedMessage {
            id: self.ids.next(),
            target_id: msg.target_id,
            sender_id: msg.sender_id,
            parent_id: msg.parent_id,
            text: msg.text,
            mode: msg.mode,
            category: msg.category,
            queued_at_ms: epoch_ms_now(),
            delivered_at_ms: None,
        };
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO message_queue \
             (id, target_id, sender_id, parent_id, text, mode, category, queued_at_ms) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                stored.id,
                stored.target_id.as_str(),
                stored.sender_id.as_ref().map(|s| s.as_str()),
                stored.parent_id.as_ref().map(|s| s.as_str()),
                stored.text,
                stored.mode.to_string(),
                stored.category,
                stored.queued_at_ms,
            ],
        )?;
        Ok(stored)
    }

    /// All undelivered messages for a target, FIFO by enqueue time.
    pub fn pending_for(&self, target: &str) -> Result<Vec<QueuedMessage>, QueueError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, target_id, sender_id, parent_id, text, mode, category, \
                    queued_at_ms, delivered_at_ms \
             FROM message_queue \
             WHERE target_id = ?1 AND delivered_at_ms IS NULL \
             ORDER BY queued_at_ms, rowid",
        )?;
        let rows = stmt.query_map(params![target], row_to_message)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// The next undelivered message for a target, if any.
    pub fn next_pending(&self, target: &str) -> Result<Option<QueuedMessage>, QueueError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, target_id, sender_id, parent_id, text, mode, category, \
                    queued_at_ms, delivered_at_ms \
             FROM message_queue \
             WHERE target_id = ?1 AND delivered_at_ms IS NULL \
             ORDER BY queued_at_ms, rowid \
             LIMIT 1",
        )?;
        let row = stmt
            .query_row(params![target], row_to_message)
            .optional()?;
        Ok(row)
    }

    /// Remove a delivered message. The delivered timestamp is recorded in
    /// the same transaction for in-flight observability before the delete.
    pub fn complete(&self, id: &str) -> Result<(), QueueError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "UPDATE message_queue SET delivered_at_ms = ?1 WHERE id = ?2",
            params![epoch_ms_now(), id],
        )?;
        tx.execute("DELETE FROM message_queue WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(())
    }

    /// Delete undelivered context-monitor rows from a given sender.
    ///
    /// Rows with a NULL category are user traffic and must never be touched
    /// by this call.
    pub fn cancel_context_monitor_from(&self, sender: &str) -> Result<usize, QueueError> {
        let conn = self.conn.lock();
        let n = conn.execute(
            "DELETE FROM message_queue \
             WHERE sender_id = ?1 AND category = ?2 AND delivered_at_ms IS NULL",
            params![sender, sesh_core::CONTEXT_MONITOR],
        )?;
        Ok(n)
    }

    /// Drop every message targeting a session (used when the target stops).
    pub fn purge_target(&self, target: &str) -> Result<usize, QueueError> {
        let conn = self.conn.lock();
        let n = conn.execute(
            "DELETE FROM message_queue WHERE target_id = ?1",
            params![target],
        )?;
        Ok(n)
    }

    /// Distinct targets with undelivered messages (crash recovery sweep).
    pub fn targets_with_pending(&self) -> Result<Vec<String>, QueueError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT DISTINCT target_id FROM message_queue WHERE delivered_at_ms IS NULL",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Number of undelivered messages for a target.
    pub fn pending_count(&self, target: &str) -> Result<u64, QueueError> {
        let conn = self.conn.lock();
        let n: u64 = conn.query_row(
            "SELECT COUNT(*) FROM message_queue \
             WHERE target_id = ?1 AND delivered_at_ms IS NULL",
            params![target],
            |row| row.get(0),
        )?;
        Ok(n)
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<QueuedMessage> {
    let mode_str: String = row.get(5)?;
    let mode: DeliveryMode = mode_str.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, e.into())
    })?;
    Ok(QueuedMessage {
        id: row.get(0)?,
        target_id: SessionId::new(row.get::<_, String>(1)?),
        sender_id: row.get::<_, Option<String>>(2)?.map(SessionId::new),
        parent_id: row.get::<_, Option<String>>(3)?.map(SessionId::new),
        text: row.get(4)?,
        mode,
        category: row.get(6)?,
        queued_at_ms: row.get(7)?,
        delivered_at_ms: row.get(8)?,
    })
}

/// Create the schema and apply idempotent column migrations.
///
/// New columns are added with `ALTER TABLE` guarded by a `pragma_table_info`
/// check so that reopening an existing database is always safe.
fn migrate(conn: &Connection) -> Result<(), QueueError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS message_queue (\
            id TEXT PRIMARY KEY,\
            target_id TEXT NOT NULL,\
            sender_id TEXT,\
            parent_id TEXT,\
            text TEXT NOT NULL,\
            mode TEXT NOT NULL,\
            queued_at_ms INTEGER NOT NULL,\
            delivered_at_ms INTEGER\
        );\
        CREATE INDEX IF NOT EXISTS idx_message_queue_target \
            ON message_queue (target_id, queued_at_ms);",
    )?;

    // The category column arrived after the initial schema.
    add_column_if_missing(conn, "message_queue", "category", "TEXT")?;

    Ok(())
}

fn add_column_if_missing(
    conn: &Connection,
    table: &str,
    column: &str,
    decl: &str,
) -> Result<(), QueueError> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM pragma_table_info(?1) WHERE name = ?2",
        params![table, column],
        |row| row.get(0),
    )?;
    if !exists {
        conn.execute_batch(&format!("ALTER TABLE {table} ADD COLUMN {column} {decl}"))?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
