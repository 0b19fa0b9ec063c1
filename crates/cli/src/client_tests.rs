// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;
use tempfile::TempDir;

#[test]
#[serial(env)]
fn port_file_wins_over_default() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("daemon.port"), "9345\n").unwrap();
    std::env::set_var("SESH_STATE_DIR", dir.path());

    assert_eq!(port_from_state_file(), Some(9345));

    std::env::remove_var("SESH_STATE_DIR");
}

#[test]
#[serial(env)]
fn missing_or_garbage_port_file_is_none() {
    let dir = TempDir::new().unwrap();
    std::env::set_var("SESH_STATE_DIR", dir.path());
    assert_eq!(port_from_state_file(), None);

    std::fs::write(dir.path().join("daemon.port"), "not-a-port\n").unwrap();
    assert_eq!(port_from_state_file(), None);

    std::env::remove_var("SESH_STATE_DIR");
}

#[tokio::test]
#[serial(env)]
async fn connect_failure_maps_to_unreachable() {
    let dir = TempDir::new().unwrap();
    // Point at a port nothing listens on
    std::fs::write(dir.path().join("daemon.port"), "1\n").unwrap();
    std::env::set_var("SESH_STATE_DIR", dir.path());

    let client = Client::connect().unwrap();
    let err = client.get("/sessions").await.unwrap_err();
    assert!(matches!(err, ClientError::Unreachable(_)));

    std::env::remove_var("SESH_STATE_DIR");
}
