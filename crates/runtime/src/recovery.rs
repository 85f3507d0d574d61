// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Death/respawn recovery state (`reflex_state.json`).
//!
//! Written by the death reflex, read back on spawn. A corrupt file at
//! startup is fatal: silently ignoring it would strand the agent's
//! recovery logic mid-plan.

use crate::game::Position;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub const RECOVERY_FILE: &str = "reflex_state.json";

#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("io error reading {RECOVERY_FILE}: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt {RECOVERY_FILE}: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryState {
    pub position: PositionRecord,
    pub dimension: String,
    pub timestamp: u64,
    pub cause: String,
    pub recoverable: bool,
    pub retry_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<Position> for PositionRecord {
    fn from(p: Position) -> Self {
        Self { x: p.x, y: p.y, z: p.z }
    }
}

impl From<PositionRecord> for Position {
    fn from(p: PositionRecord) -> Self {
        Self { x: p.x, y: p.y, z: p.z }
    }
}

/// Load the recovery state, if present. Corruption is an error, not a
/// default: the caller decides whether that aborts startup.
pub fn load_recovery_state(state_dir: &Path) -> Result<Option<RecoveryState>, RecoveryError> {
    let path = state_dir.join(RECOVERY_FILE);
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_str(&text)?))
}

pub fn save_recovery_state(state_dir: &Path, state: &RecoveryState) -> Result<(), RecoveryError> {
    let path = state_dir.join(RECOVERY_FILE);
    let text = serde_json::to_string_pretty(state)?;
    std::fs::write(path, text)?;
    Ok(())
}

pub fn remove_recovery_state(state_dir: &Path) {
    let path = state_dir.join(RECOVERY_FILE);
    if let Err(e) = std::fs::remove_file(&path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(error = %e, "failed to remove recovery state");
        }
    }
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
