// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal output formatting for session listings.

use serde_json::Value;
use sesh_core::{epoch_ms_now, format_elapsed_ms};

/// Render the session list as an aligned table.
pub fn print_session_table(response: &Value) {
    print!("{}", session_table(response, epoch_ms_now()));
}

fn session_table(response: &Value, now_ms: u64) -> String {
    let sessions = match response.get("sessions").and_then(|v| v.as_array()) {
        Some(s) if !s.is_empty() => s,
        _ => return "no sessions\n".to_string(),
    };

    let mut out = format!(
        "{:<10} {:<12} {:<9} {:<14} {:<8} NAME\n",
        "ID", "PROVIDER", "STATUS", "LAST TOOL", "AGE"
    );
    for session in sessions {
        let age = now_ms.saturating_sub(session["created_at_ms"].as_u64().unwrap_or(0));
        out.push_str(&format!(
            "{:<10} {:<12} {:<9} {:<14} {:<8} {}\n",
            session["id"].as_str().unwrap_or("?"),
            session["provider"].as_str().unwrap_or("?"),
            session["status"].as_str().unwrap_or("?"),
            session["last_tool_name"].as_str().unwrap_or("-"),
            format_elapsed_ms(age),
            session["friendly_name"].as_str().unwrap_or(""),
        ));
    }
    out
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
