// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Golem daemon library: configuration, lifecycle, and the engine loop.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod engine;
pub mod env;
pub mod lifecycle;
mod mind;
mod offline;

pub use engine::run_engine;
pub use lifecycle::{startup, Config, DaemonState, LifecycleError};
pub use mind::{attach_mind, MindHandles};
pub use offline::OfflineTransport;
