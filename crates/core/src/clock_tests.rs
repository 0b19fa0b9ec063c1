// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn epoch_ms_is_plausible() {
    // Well after 2020-01-01 and monotonic-ish
    let a = epoch_ms_now();
    assert!(a > 1_577_836_800_000);
    assert!(epoch_ms_now() >= a);
}

#[test]
fn epoch_ms_has_millisecond_resolution() {
    let a = epoch_ms_now();
    std::thread::sleep(std::time::Duration::from_millis(5));
    let b = epoch_ms_now();
    assert!(b >= a + 4);
}
