// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backups, failure-rate tracking, and automatic restore.
//!
//! Consumes `SkillSuccess` / `SkillFailed` from the bus. All skill file
//! writes go back through [`SkillLibrary`]; this manager never takes
//! the library lock directly, it calls library operations that do.

use crate::library::{backup_file, AddObserver, SkillLibrary};
use golem_core::{Clock, Signal, SignalKind, SignalSink};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Trials required before the failure rate is trusted.
pub const MIN_TRIALS: u64 = 5;
/// Failure rate at or above which the previous version is restored.
pub const ROLLBACK_THRESHOLD: f64 = 0.8;

/// Per-skill outcome counters since the last add.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkillHealth {
    pub failures: u64,
    pub trials: u64,
    pub last_failure_ms: Option<u64>,
}

pub struct RollbackManager<C: Clock> {
    library: Arc<SkillLibrary<C>>,
    backups_dir: PathBuf,
    health: Mutex<HashMap<String, SkillHealth>>,
    sink: Option<SignalSink>,
    clock: C,
}

impl<C: Clock> RollbackManager<C> {
    pub fn new(
        library: Arc<SkillLibrary<C>>,
        backups_dir: PathBuf,
        clock: C,
        sink: Option<SignalSink>,
    ) -> std::io::Result<Self> {
        std::fs::create_dir_all(&backups_dir)?;
        Ok(Self { library, backups_dir, health: Mutex::new(HashMap::new()), sink, clock })
    }

    pub fn health_of(&self, name: &str) -> Option<SkillHealth> {
        self.health.lock().get(name).copied()
    }

    /// React to one skill outcome signal.
    pub async fn handle_signal(&self, signal: &Signal) {
        let Some(name) = signal.payload_str("name").map(String::from) else {
            return;
        };
        match signal.kind {
            SignalKind::SkillSuccess => {
                self.health.lock().entry(name).or_default().trials += 1;
            }
            SignalKind::SkillFailed => self.on_failure(&name).await,
            _ => {}
        }
    }

    async fn on_failure(&self, name: &str) {
        let backup = backup_file(&self.backups_dir, name);
        // Without a backup there is nothing to restore to; the
        // blacklist handles those skills instead.
        if !backup.exists() {
            return;
        }

        let should_restore = {
            let mut health = self.health.lock();
            let entry = health.entry(name.to_string()).or_default();
            entry.failures += 1;
            entry.trials += 1;
            entry.last_failure_ms = Some(self.clock.epoch_ms());
            entry.trials >= MIN_TRIALS
                && (entry.failures as f64 / entry.trials as f64) >= ROLLBACK_THRESHOLD
        };
        if should_restore {
            self.restore(name, &backup).await;
        }
    }

    async fn restore(&self, name: &str, backup: &Path) {
        if self.library.recorded_path(name).await.is_none() {
            tracing::warn!(skill = name, "no recorded path for degraded skill, skipping restore");
            return;
        }
        let bytes = match tokio::fs::read(backup).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(skill = name, error = %e, "failed to read backup");
                return;
            }
        };
        if let Err(e) = self.library.restore(name, &bytes).await {
            tracing::warn!(skill = name, error = %e, "failed to restore backup");
            return;
        }
        self.health.lock().remove(name);
        tracing::info!(skill = name, "restored previous version after degraded failure rate");
        if let Some(sink) = &self.sink {
            sink(Signal::new(
                SignalKind::RuleReverted,
                json!({"name": name, "reason": "failure rate exceeded rollback threshold"}),
                self.clock.epoch_ms(),
            ));
        }
    }

    /// Spawn the pump that drains bus signals into this manager.
    /// The returned sender is what gets subscribed to the bus.
    pub fn spawn_pump(self: &Arc<Self>) -> mpsc::UnboundedSender<Signal> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Signal>();
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(signal) = rx.recv().await {
                manager.handle_signal(&signal).await;
            }
        });
        tx
    }
}

impl<C: Clock> AddObserver for RollbackManager<C> {
    /// Called by the library after a successful add: keep the previous
    /// version and start the health record over.
    fn skill_added(&self, name: &str, previous: Option<&[u8]>) {
        if let Some(bytes) = previous {
            let path = backup_file(&self.backups_dir, name);
            if let Err(e) = std::fs::write(&path, bytes) {
                tracing::warn!(skill = name, error = %e, "failed to write backup");
            }
        }
        self.health.lock().insert(name.to_string(), SkillHealth::default());
    }
}

#[cfg(test)]
#[path = "rollback_tests.rs"]
mod tests;
