// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
#[serial(env)]
fn chat_poll_timeout_default_and_override() {
    std::env::remove_var("SESH_CHAT_POLL_TIMEOUT_MS");
    assert_eq!(chat_poll_timeout(), Duration::from_secs(15));

    std::env::set_var("SESH_CHAT_POLL_TIMEOUT_MS", "2500");
    assert_eq!(chat_poll_timeout(), Duration::from_millis(2500));
    std::env::remove_var("SESH_CHAT_POLL_TIMEOUT_MS");
}

#[test]
#[serial(env)]
fn health_threshold_ignores_garbage() {
    std::env::set_var("SESH_CHAT_HEALTH_MS", "not-a-number");
    assert_eq!(chat_health_threshold(), Duration::from_secs(45));
    std::env::remove_var("SESH_CHAT_HEALTH_MS");
}
