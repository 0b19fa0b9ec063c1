// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn uuid_gen_produces_unique_ids() {
    let gen = UuidIdGen;
    let a = gen.next();
    let b = gen.next();
    assert_ne!(a, b);
    assert_eq!(a.len(), 36);
}

#[test]
fn sequential_gen_counts_up() {
    let gen = SequentialIdGen::new("msg");
    assert_eq!(gen.next(), "msg-1");
    assert_eq!(gen.next(), "msg-2");

    // Clones share the counter
    let clone = gen.clone();
    assert_eq!(clone.next(), "msg-3");
}

#[test]
fn short_session_id_is_eight_hex_chars() {
    let id = short_session_id();
    assert_eq!(id.len(), SESSION_ID_LEN);
    assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
}

#[parameterized(
    shorter = { "abc", 8, "abc" },
    exact = { "abcdefgh", 8, "abcdefgh" },
    longer = { "abcdefgh123", 8, "abcdefgh" },
)]
fn short_truncates(input: &str, n: usize, expected: &str) {
    assert_eq!(input.short(n), expected);
}

#[test]
fn define_id_macro_generates_comparisons() {
    crate::define_id! {
        pub struct TestId;
    }

    let id = TestId::new("abcdef");
    assert_eq!(id, "abcdef");
    assert_eq!(id.as_str(), "abcdef");
    assert_eq!(id.short(3), "abc");
    assert_eq!(id.to_string(), "abcdef");
    assert_eq!(TestId::from("x".to_string()), TestId::new("x"));
}
