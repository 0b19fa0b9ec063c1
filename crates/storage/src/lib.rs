// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Storage layer for sesh: registry snapshots and the durable message queue.

mod queue;
mod snapshot;
mod tooluse;

pub use queue::{MessageQueue, QueueError};
pub use snapshot::{RegistrySnapshot, SnapshotError};
pub use tooluse::{ToolUsageStore, ToolUseEntry};
