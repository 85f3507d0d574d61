// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: configuration, startup, recovery, shutdown.
//!
//! Exit codes: 0 normal shutdown, 1 fatal init error, 2 config error.

use crate::env;
use golem_core::{Clock, SystemClock};
use golem_memory::BridgeConfig;
use golem_mind::BrainConfig;
use golem_runtime::{load_recovery_state, AgentServices, GameFacade, ServicesConfig, WireError};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("no usable state directory (set GOLEM_STATE_DIR or HOME)")]
    NoStateDir,
    #[error("configuration error: {0}")]
    Config(String),
    #[error("failed to prepare state directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt recovery state: {0}")]
    CorruptRecovery(String),
    #[error("wiring failed: {0}")]
    Wire(#[from] WireError),
}

impl LifecycleError {
    /// Process exit code for this failure class.
    pub fn exit_code(&self) -> i32 {
        match self {
            LifecycleError::Config(_) | LifecycleError::NoStateDir => 2,
            _ => 1,
        }
    }
}

/// Daemon configuration, resolved from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub state_dir: PathBuf,
    pub log_path: PathBuf,
    pub tick: Duration,
    pub mindserver_port: u16,
    pub memory_url: String,
    pub insecure_coding: bool,
    pub blocked_actions: HashSet<String>,
    pub max_messages: usize,
    pub num_examples: usize,
    pub log_all: bool,
    /// Fixed per game session.
    pub world_id: Uuid,
}

impl Config {
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = env::state_dir()?;
        Ok(Self {
            log_path: state_dir.join("daemon.log"),
            tick: env::tick(),
            mindserver_port: env::mindserver_port(),
            memory_url: env::memory_service_url(),
            insecure_coding: env::insecure_coding(),
            blocked_actions: env::blocked_actions()?,
            max_messages: env::max_messages(),
            num_examples: env::num_examples(),
            log_all: env::log_all(),
            world_id: Uuid::new_v4(),
            state_dir,
        })
    }

    pub fn brain_config(&self) -> BrainConfig {
        BrainConfig {
            max_messages: self.max_messages,
            num_examples: self.num_examples,
            log_all: self.log_all,
            ..BrainConfig::default()
        }
    }
}

/// Live daemon state.
pub struct DaemonState<G: GameFacade + 'static> {
    pub config: Config,
    pub services: Arc<AgentServices<G, SystemClock>>,
}

impl<G: GameFacade + 'static> std::fmt::Debug for DaemonState<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DaemonState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Bring the agent up: prepare directories, verify recovery state, wire
/// every subsystem.
///
/// Runtime errors never come back through here; anything that fails in
/// this function is fatal for the process.
pub async fn startup<G: GameFacade + 'static>(
    config: Config,
    game: Arc<G>,
) -> Result<DaemonState<G>, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;

    // A corrupt reflex_state.json aborts startup with a diagnostic;
    // recovery silently skipping a death would be worse than stopping.
    if let Err(e) = load_recovery_state(&config.state_dir) {
        return Err(LifecycleError::CorruptRecovery(e.to_string()));
    }

    if config.insecure_coding {
        tracing::warn!("INSECURE_CODING is set: sandbox static scan disabled");
    }

    let services = AgentServices::wire(
        ServicesConfig {
            state_dir: config.state_dir.clone(),
            insecure_coding: config.insecure_coding,
            blocked_actions: config.blocked_actions.clone(),
            memory: BridgeConfig::new(config.memory_url.clone()),
            strict_metadata: false,
            world_id: config.world_id,
        },
        game,
        SystemClock,
    )
    .await?;

    tracing::info!(
        state_dir = %config.state_dir.display(),
        world_id = %config.world_id,
        mindserver_port = config.mindserver_port,
        "golem daemon ready"
    );
    Ok(DaemonState { config, services })
}

impl<G: GameFacade + 'static> DaemonState<G> {
    /// Graceful shutdown: stop autonomous prompting, cancel tasks, and
    /// flush whatever the bus still holds.
    pub fn shutdown(&self) {
        tracing::info!("shutting down golem daemon");
        self.services.prompter.stop();
        self.services.scheduler.stop_all();
        self.services.bus.dispatch_pending();
        let uptime_stats = self.services.bus.stats();
        tracing::info!(signals = uptime_stats.values().sum::<u64>(), "final signal totals");
    }
}

/// Current epoch ms via the daemon's clock; startup diagnostics only.
pub fn boot_timestamp() -> u64 {
    SystemClock.epoch_ms()
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
