// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Friendly pane name generation.

/// Generate a friendly pane name from a session's display name.
///
/// Format: `{name}-{random}` (sesh- prefix added by the adapter).
/// Sanitized for tmux compatibility and suffixed for uniqueness.
pub fn generate_pane_name(display_name: &str) -> String {
    let sanitized = sanitize_for_tmux(display_name, 24);
    let suffix = generate_short_random(4);
    if sanitized.is_empty() {
        suffix
    } else {
        format!("{}-{}", sanitized, suffix)
    }
}

/// Sanitize a string for use in tmux session names.
///
/// tmux session names cannot contain: colon `:`, period `.`
/// Also replaces other problematic characters for shell friendliness.
fn sanitize_for_tmux(s: &str, max_len: usize) -> String {
    let sanitized: String = s
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
            _ => '-',
        })
        .collect();

    // Collapse multiple hyphens and trim
    let collapsed = sanitized
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    // Truncate to max length (avoid cutting mid-hyphen)
    if collapsed.len() <= max_len {
        collapsed
    } else {
        collapsed[..max_len].trim_end_matches('-').to_string()
    }
}

/// Generate a short random hex string.
fn generate_short_random(len: usize) -> String {
    use rand::Rng;
    let mut rng = rand::rng();
    (0..len)
        .map(|_| format!("{:x}", rng.random::<u8>() % 16))
        .collect()
}

#[cfg(test)]
#[path = "name_tests.rs"]
mod tests;
