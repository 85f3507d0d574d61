// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Resolve state directory: GOLEM_STATE_DIR > XDG_STATE_HOME/golem > ~/.local/state/golem
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("GOLEM_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("golem"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/golem"))
}

/// Engine tick override (default 25 ms, clamped to the 10–50 ms band).
pub fn tick() -> Duration {
    std::env::var("GOLEM_TICK_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(|ms| Duration::from_millis(ms.clamp(10, 50)))
        .unwrap_or(Duration::from_millis(25))
}

/// Mind-server port handed to the external UI collaborator.
pub fn mindserver_port() -> u16 {
    std::env::var("MINDSERVER_PORT").ok().and_then(|s| s.parse::<u16>().ok()).unwrap_or(8080)
}

/// Base URL of the episodic memory service.
pub fn memory_service_url() -> String {
    std::env::var("GOLEM_MEMORY_URL")
        .unwrap_or_else(|_| "http://127.0.0.1:8765".to_string())
}

/// `INSECURE_CODING=1` disables the sandbox static scan. Debug only.
pub fn insecure_coding() -> bool {
    matches!(std::env::var("INSECURE_CODING").as_deref(), Ok("1") | Ok("true"))
}

/// `BLOCKED_ACTIONS`: JSON list of action names to refuse to dispatch.
/// A malformed value is a configuration error, not a silent default.
pub fn blocked_actions() -> Result<HashSet<String>, LifecycleError> {
    match std::env::var("BLOCKED_ACTIONS") {
        Err(_) => Ok(HashSet::new()),
        Ok(raw) => serde_json::from_str::<Vec<String>>(&raw)
            .map(|list| list.into_iter().collect())
            .map_err(|e| LifecycleError::Config(format!("BLOCKED_ACTIONS is not a JSON list: {e}"))),
    }
}

/// `MAX_MESSAGES`: planner chat-history cap.
pub fn max_messages() -> usize {
    std::env::var("MAX_MESSAGES").ok().and_then(|s| s.parse().ok()).unwrap_or(32)
}

/// `NUM_EXAMPLES`: memories injected per planning request.
pub fn num_examples() -> usize {
    std::env::var("NUM_EXAMPLES").ok().and_then(|s| s.parse().ok()).unwrap_or(5)
}

/// `LOG_ALL=1`: verbose prompt logging.
pub fn log_all() -> bool {
    matches!(std::env::var("LOG_ALL").as_deref(), Ok("1") | Ok("true"))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
