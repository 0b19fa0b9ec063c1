// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wall-clock helpers.
//!
//! Persisted records carry epoch milliseconds; monotonic timing (the skip
//! fence, poll deadlines) uses `std::time::Instant` directly at the call
//! sites. Tests drive timing with real tokio sleeps and small thresholds.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as epoch milliseconds.
pub fn epoch_ms_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
