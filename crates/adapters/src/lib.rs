// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Adapters for external collaborators: the tmux terminal driver and the
//! remote-chat gateway. The orchestration core consumes these through
//! traits; the fakes record calls for tests.

pub mod chat;
pub mod env;
pub mod terminal;

pub use chat::{ChatGateway, ChatUpdate, GatewayError, TelegramGateway};
pub use terminal::{generate_pane_name, TerminalAdapter, TerminalError, TmuxAdapter};

#[cfg(any(test, feature = "test-support"))]
pub use chat::FakeChatGateway;
#[cfg(any(test, feature = "test-support"))]
pub use terminal::{FakeTerminalAdapter, TerminalCall};
