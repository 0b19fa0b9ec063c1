// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(args).unwrap()
}

#[test]
fn spawn_defaults() {
    let cli = parse(&["sesh", "spawn"]);
    match cli.command {
        Command::Spawn {
            provider,
            name,
            em,
            monitor_context,
            ..
        } => {
            assert_eq!(provider, "claude_tmux");
            assert!(name.is_empty());
            assert!(!em);
            assert!(!monitor_context);
        }
        _ => panic!("expected spawn"),
    }
}

#[test]
fn send_with_dispatch_options() {
    let cli = parse(&[
        "sesh",
        "send",
        "ab12",
        "build the thing",
        "--mode",
        "important",
        "--remind-soft",
        "210",
        "--remind-hard",
        "420",
        "--parent",
        "ef56",
        "--notify-on-stop",
    ]);
    match cli.command {
        Command::Send {
            session,
            text,
            mode,
            remind_soft,
            remind_hard,
            parent,
            notify_on_stop,
            ..
        } => {
            assert_eq!(session, "ab12");
            assert_eq!(text, "build the thing");
            assert_eq!(mode, "important");
            assert_eq!(remind_soft, Some(210));
            assert_eq!(remind_hard, Some(420));
            assert_eq!(parent.as_deref(), Some("ef56"));
            assert!(notify_on_stop);
        }
        _ => panic!("expected send"),
    }
}

#[parameterized(
    list = { &["sesh", "list"] },
    show = { &["sesh", "show", "ab12"] },
    kill = { &["sesh", "kill", "ab12"] },
    output = { &["sesh", "output", "ab12", "--lines", "100"] },
    watch = { &["sesh", "watch", "ab12", "cd34", "--timeout", "60"] },
    handoff = { &["sesh", "handoff", "ab12", "/tmp/resume.md"] },
    status = { &["sesh", "status", "ab12", "running tests"] },
    key = { &["sesh", "key", "ab12", "Escape"] },
)]
fn subcommands_parse(args: &[&str]) {
    let _ = parse(args);
}

#[test]
fn missing_args_fail() {
    assert!(Cli::try_parse_from(["sesh", "send", "ab12"]).is_err());
    assert!(Cli::try_parse_from(["sesh", "handoff"]).is_err());
    assert!(Cli::try_parse_from(["sesh"]).is_err());
}
