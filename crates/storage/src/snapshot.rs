// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry snapshot persistence.
//!
//! The session registry is write-through: every state-mutating operation
//! saves the complete snapshot. Saves are atomic (write to .tmp, fsync,
//! rename) so a crash mid-save never corrupts the previous snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sesh_core::{EmTopic, Session};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Errors that can occur in snapshot operations
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The complete persisted registry state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    #[serde(default)]
    pub sessions: Vec<Session>,
    /// External-chat thread inherited by successive EM sessions
    #[serde(default)]
    pub em_topic: Option<EmTopic>,
    /// When this snapshot was written
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

impl RegistrySnapshot {
    pub fn new(sessions: Vec<Session>, em_topic: Option<EmTopic>) -> Self {
        Self {
            sessions,
            em_topic,
            saved_at: Some(Utc::now()),
        }
    }

    /// Save the snapshot atomically (write to .tmp, then rename).
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = path.with_extension("tmp");

        // Write to temp file and sync
        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, self)?;
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
        }

        // Atomic rename
        fs::rename(&tmp_path, path)?;

        Ok(())
    }

    /// Load the snapshot if it exists.
    ///
    /// Returns `Ok(None)` if the file doesn't exist or is corrupt. Corrupt
    /// snapshots are rotated to a `.bak` file so the daemon can start fresh
    /// without destroying the evidence.
    pub fn load(path: &Path) -> Result<Option<Self>, SnapshotError> {
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(path)?;
        let reader = BufReader::new(file);
        match serde_json::from_reader(reader) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                let stash = stash_slot(path);
                warn!(
                    error = %e,
                    path = %path.display(),
                    stash = %stash.display(),
                    "Corrupt registry snapshot, stashing and starting fresh",
                );
                fs::rename(path, &stash)?;
                Ok(None)
            }
        }
    }
}

/// How many corrupt snapshots to keep around for inspection.
const KEPT_STASHES: u32 = 3;

/// Free up the `.bak` slot for a corrupt snapshot.
///
/// The newest corruption always lands in `.bak`; existing stashes shift
/// down to `.bak.2` and `.bak.3`, and whatever occupied the last slot is
/// dropped. Shift failures are ignored; startup must not hinge on them.
fn stash_slot(path: &Path) -> PathBuf {
    let slot = |n: u32| match n {
        1 => path.with_extension("bak"),
        n => path.with_extension(format!("bak.{n}")),
    };

    let _ = fs::remove_file(slot(KEPT_STASHES));
    for n in (2..=KEPT_STASHES).rev() {
        let older = slot(n - 1);
        if older.exists() {
            let _ = fs::rename(&older, slot(n));
        }
    }

    slot(1)
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
