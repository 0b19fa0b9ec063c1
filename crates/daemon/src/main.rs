// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! sesh daemon (seshd)
//!
//! Background process that owns the session orchestration core.
//!
//! Architecture:
//! - HTTP control plane on loopback: CLI commands and agent hook callbacks
//! - Chat bridge: long-poll inbound from Telegram, notice relay outbound
//! - Engine background tasks: reminders, watchers, prompt inspection

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::sync::Arc;

use sesh_adapters::TelegramGateway;
use sesh_daemon::lifecycle::{self, Config, LifecycleError};
use sesh_daemon::telegram::ChatBridge;
use sesh_daemon::{env, http};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle info flags before any config/lock acquisition
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("seshd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("seshd {}", env!("CARGO_PKG_VERSION"));
                println!("sesh daemon - owns the agent session orchestration core");
                println!();
                println!("USAGE:");
                println!("    seshd");
                println!();
                println!("The daemon is typically started by the `sesh` CLI and should not");
                println!("be invoked directly. It serves HTTP on 127.0.0.1 (SESH_PORT,");
                println!("default 7321) for CLI commands and agent hook callbacks.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: seshd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;

    // Rotate the log file if it has grown too large
    rotate_log_if_needed(&config.log_path);

    // Write startup marker to log (before tracing setup, so the CLI can
    // find where this startup attempt begins)
    write_startup_marker(&config)?;

    let log_guard = setup_logging(&config)?;

    info!("Starting user-level daemon");

    let mut daemon = match lifecycle::startup(&config).await {
        Ok(state) => state,
        Err(LifecycleError::LockFailed(_)) => {
            let pid = std::fs::read_to_string(&config.lock_path)
                .unwrap_or_default()
                .trim()
                .to_string();
            eprintln!("seshd is already running");
            if !pid.is_empty() {
                eprintln!("  pid: {pid}");
            }
            std::process::exit(1);
        }
        Err(e) => {
            write_startup_error(&config, &e);
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    // Bind the control plane (loopback only; local trust)
    let port = env::http_port();
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    let bound_port = listener.local_addr()?.port();
    std::fs::write(&config.port_path, format!("{bound_port}\n"))?;

    let app = http::router(Arc::clone(&daemon.runtime));
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server error: {}", e);
        }
    });

    // Background prompt inspection for hookless providers
    let _inspector = daemon.runtime.spawn_prompt_inspector();

    // Chat bridge, when configured
    let notice_rx = std::mem::replace(&mut daemon.notice_rx, tokio::sync::mpsc::channel(1).1);
    match (env::telegram_token(), env::telegram_chat_id()) {
        (Some(token), Some(chat_id)) => match TelegramGateway::new(&token) {
            Ok(gateway) => {
                let bridge = Arc::new(ChatBridge::new(
                    Arc::clone(&daemon.runtime),
                    gateway,
                    chat_id,
                ));
                tokio::spawn(Arc::clone(&bridge).run_inbound());
                tokio::spawn(bridge.run_outbound(notice_rx));
                info!(chat_id, "chat bridge started");
            }
            Err(e) => warn!(error = %e, "chat gateway setup failed, bridge disabled"),
        },
        _ => {
            info!("chat bridge disabled (no SESH_TELEGRAM_TOKEN / SESH_TELEGRAM_CHAT_ID)");
            // Drain notices so the engine's channel never backs up
            tokio::spawn(async move {
                let mut rx = notice_rx;
                while rx.recv().await.is_some() {}
            });
        }
    }

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!(port = bound_port, "Daemon ready");

    // Signal ready for parent process (CLI waiting for startup)
    println!("READY");

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
    }

    daemon.shutdown();
    info!("Daemon stopped");
    Ok(())
}

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep (daemon.log.1, .2, .3).
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the daemon log file if it exceeds [`MAX_LOG_SIZE`].
///
/// Shifts `daemon.log` → `daemon.log.1` → `daemon.log.2` → `daemon.log.3`,
/// deleting the oldest. Best-effort: rotation failures are silently ignored
/// so the daemon still starts.
fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };

    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();

    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }

    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

/// Startup marker prefix written to log before anything else.
/// Full format: "--- seshd: starting (pid: 12345) ---"
const STARTUP_MARKER_PREFIX: &str = "--- seshd: starting (pid: ";

fn write_startup_marker(config: &Config) -> Result<(), LifecycleError> {
    use std::io::Write;

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;
    writeln!(file, "{}{}) ---\n", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

/// Write startup error synchronously to the log file, so it is visible to
/// the CLI even if the process exits before tracing flushes.
fn write_startup_error(config: &Config, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start daemon: {}", error);
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().ok_or(LifecycleError::NoStateDir)?,
        config
            .log_path
            .file_name()
            .ok_or(LifecycleError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
