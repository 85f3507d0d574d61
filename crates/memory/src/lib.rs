// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-world episodic memory: remote service bridge with a local
//! vector-store fallback.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod bridge;
mod vector;

pub use bridge::{BridgeConfig, BridgeStats, MemoryBridge, MemoryError, RecallResult, StoreResult};
pub use vector::{Embedder, HashEmbedder, VectorStore};
