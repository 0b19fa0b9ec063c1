// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! sesh CLI: thin wrapper over the daemon's HTTP control plane.
//!
//! Exit codes: 0 success, 1 user error (bad identifier, validation),
//! 2 backend unavailable.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod output;

use clap::{Parser, Subcommand};
use client::{Client, ClientError};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "sesh", version, about = "Orchestrate agent sessions in tmux panes")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Spawn a new agent session
    Spawn {
        /// Provider: claude_tmux, codex_tmux, or codex_app
        #[arg(long, default_value = "claude_tmux")]
        provider: String,
        /// Working directory for the agent
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        /// Friendly name
        #[arg(long, default_value = "")]
        name: String,
        /// Override the agent command line
        #[arg(long)]
        command: Option<String>,
        /// Parent session (for wake-up digests)
        #[arg(long)]
        parent: Option<String>,
        /// Mark this session as the operator/EM session
        #[arg(long)]
        em: bool,
        /// Enable context usage monitoring
        #[arg(long)]
        monitor_context: bool,
    },
    /// List sessions
    List,
    /// Show one session
    Show { session: String },
    /// Send a message to a session
    Send {
        session: String,
        text: String,
        /// Delivery mode: sequential, important, or urgent
        #[arg(long, default_value = "sequential")]
        mode: String,
        /// Sender session id (for replies and stop notifications)
        #[arg(long)]
        from: Option<String>,
        /// Soft reminder threshold in seconds
        #[arg(long)]
        remind_soft: Option<u64>,
        /// Hard reminder threshold in seconds
        #[arg(long)]
        remind_hard: Option<u64>,
        /// Parent session for wake-up digests
        #[arg(long)]
        parent: Option<String>,
        /// Notify the sender when the target stops
        #[arg(long)]
        notify_on_stop: bool,
    },
    /// Send a raw key to a session's pane
    Key { session: String, key: String },
    /// Kill a session
    Kill { session: String },
    /// Run the context handoff protocol
    Handoff {
        session: String,
        continuation_path: PathBuf,
    },
    /// Watch a session and notify an observer when it goes idle
    Watch {
        target: String,
        observer: String,
        /// Timeout in seconds
        #[arg(long, default_value_t = 600)]
        timeout: u64,
    },
    /// Show the last lines of a session's pane
    Output {
        session: String,
        #[arg(long, default_value_t = 40)]
        lines: u32,
    },
    /// Record an agent status update (resets reminder timers)
    Status { session: String, text: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let (verb, code) = match &e {
                RunError::Client(ClientError::Unreachable(_)) => ("connect", 2),
                _ => ("command", 1),
            };
            eprintln!("{verb} failed: {e}");
            ExitCode::from(code)
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum RunError {
    #[error("{0}")]
    Client(#[from] ClientError),
}

async fn run(command: Command) -> Result<(), RunError> {
    let client = Client::connect()?;

    match command {
        Command::Spawn {
            provider,
            dir,
            name,
            command,
            parent,
            em,
            monitor_context,
        } => {
            let dir = dir.canonicalize().unwrap_or(dir);
            let body = json!({
                "provider": provider,
                "working_dir": dir,
                "friendly_name": name,
                "command": command,
                "parent_id": parent,
                "is_em": em,
                "context_monitor_enabled": monitor_context,
            });
            let response = client.post("/sessions", body).await?;
            println!("{}", response["id"].as_str().unwrap_or_default());
        }
        Command::List => {
            let response = client.get("/sessions").await?;
            output::print_session_table(&response);
        }
        Command::Show { session } => {
            let response = client.get(&format!("/sessions/{session}")).await?;
            println!("{}", serde_json::to_string_pretty(&response).unwrap_or_default());
        }
        Command::Send {
            session,
            text,
            mode,
            from,
            remind_soft,
            remind_hard,
            parent,
            notify_on_stop,
        } => {
            let body = json!({
                "text": text,
                "mode": mode,
                "sender_id": from,
                "remind_soft_s": remind_soft,
                "remind_hard_s": remind_hard,
                "parent_id": parent,
                "notify_on_stop": notify_on_stop,
            });
            client
                .post(&format!("/sessions/{session}/input"), body)
                .await?;
            println!("queued");
        }
        Command::Key { session, key } => {
            client
                .post(&format!("/sessions/{session}/key"), json!({ "key": key }))
                .await?;
        }
        Command::Kill { session } => {
            client.delete(&format!("/sessions/{session}")).await?;
            println!("killed {session}");
        }
        Command::Handoff {
            session,
            continuation_path,
        } => {
            client
                .post(
                    &format!("/sessions/{session}/handoff"),
                    json!({ "continuation_path": continuation_path }),
                )
                .await?;
            println!("handoff started");
        }
        Command::Watch {
            target,
            observer,
            timeout,
        } => {
            client
                .post(
                    "/watch",
                    json!({ "target": target, "observer": observer, "timeout_s": timeout }),
                )
                .await?;
            println!("watching {target}");
        }
        Command::Output { session, lines } => {
            let response = client
                .get(&format!("/sessions/{session}/output?lines={lines}"))
                .await?;
            print!("{}", response["output"].as_str().unwrap_or_default());
        }
        Command::Status { session, text } => {
            client
                .post(
                    &format!("/sessions/{session}/status"),
                    json!({ "status": text }),
                )
                .await?;
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
