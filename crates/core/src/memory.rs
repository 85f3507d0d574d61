// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Episodic memory records.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One remembered fact, scoped to the world it was learned in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub world_id: Uuid,
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Present once the local store has embedded the text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub ts: u64,
}

impl MemoryRecord {
    pub fn new(world_id: Uuid, text: &str, ts: u64) -> Self {
        Self { world_id, text: text.to_string(), tags: Vec::new(), embedding: None, ts }
    }
}
