// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in survival reflexes.
//!
//! Each one is a native callback: it interrupts the state stack and
//! queues the routine that serves the new state. Routines themselves
//! run cooperatively under the scheduler, never inside the handler.

use crate::game::{GameFacade, Position};
use crate::recovery::{
    load_recovery_state, remove_recovery_state, save_recovery_state, PositionRecord,
    RecoveryState,
};
use crate::registry::ReflexRegistry;
use crate::scheduler::{Scheduler, TaskContext, TaskFuture};
use golem_core::{Clock, Priority, Signal, SignalKind, StateStack};
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::sync::Arc;

const MAX_RECOVERY_RETRIES: u32 = 3;

struct Reflexes<G: GameFacade + 'static, C: Clock> {
    stack: Arc<StateStack<C>>,
    scheduler: Arc<Scheduler<C>>,
    game: Arc<G>,
    state_dir: PathBuf,
    clock: C,
}

/// Attach the static reflex set to the registry.
pub fn install_static_reflexes<G: GameFacade + 'static, C: Clock>(
    registry: &ReflexRegistry<C>,
    stack: Arc<StateStack<C>>,
    scheduler: Arc<Scheduler<C>>,
    game: Arc<G>,
    state_dir: PathBuf,
    clock: C,
) {
    let shared = Arc::new(Reflexes { stack, scheduler, game, state_dir, clock });

    {
        let r = Arc::clone(&shared);
        registry.register_static(SignalKind::ThreatDetected, "combat", move |s| r.on_threat(s));
    }
    {
        let r = Arc::clone(&shared);
        registry.register_static(SignalKind::HealthCritical, "critical_health", move |s| {
            r.on_health_critical(s)
        });
    }
    {
        let r = Arc::clone(&shared);
        registry.register_static(SignalKind::HealthLow, "low_health", move |s| r.on_survival(s));
    }
    {
        let r = Arc::clone(&shared);
        registry.register_static(SignalKind::Hungry, "hunger", move |s| r.on_survival(s));
    }
    {
        let r = Arc::clone(&shared);
        registry.register_static(SignalKind::CliffAhead, "cliff_stop", move |s| r.on_hazard(s));
    }
    {
        let r = Arc::clone(&shared);
        registry.register_static(SignalKind::LavaNearby, "lava_stop", move |s| r.on_hazard(s));
    }
    {
        let r = Arc::clone(&shared);
        registry.register_static(SignalKind::Death, "death", move |s| r.on_death(s));
    }
    {
        let r = Arc::clone(&shared);
        registry.register_static(SignalKind::Spawn, "spawn_recovery", move |s| r.on_spawn(s));
    }
    {
        let r = shared;
        registry.register_static(SignalKind::HumanOverride, "human_override", move |s| {
            r.on_override(s)
        });
    }
}

impl<G: GameFacade + 'static, C: Clock> Reflexes<G, C> {
    fn on_threat(&self, signal: &Signal) {
        let mut context = Map::new();
        context.insert("threat".to_string(), signal.payload.clone());
        if !self.stack.interrupt("Combat", Priority::COMBAT, context) {
            return;
        }
        let game = Arc::clone(&self.game);
        self.scheduler.schedule(
            "Combat",
            Priority::COMBAT,
            Box::new(move |task| combat_routine(game, task)),
        );
    }

    fn on_health_critical(&self, signal: &Signal) {
        let mut context = Map::new();
        context.insert("reason".to_string(), json!("health_critical"));
        context.insert("health".to_string(), signal.payload.get("amount").cloned().unwrap_or(Value::Null));
        if !self.stack.interrupt("Critical", Priority::CRITICAL, context) {
            return;
        }
        let game = Arc::clone(&self.game);
        self.scheduler.schedule(
            "Critical",
            Priority::CRITICAL,
            Box::new(move |task| retreat_routine(game, task)),
        );
    }

    fn on_survival(&self, signal: &Signal) {
        let mut context = Map::new();
        context.insert("need".to_string(), json!(signal.kind.name()));
        if !self.stack.interrupt("Survival", Priority::SURVIVAL, context) {
            return;
        }
        let game = Arc::clone(&self.game);
        self.scheduler.schedule(
            "Survival",
            Priority::SURVIVAL,
            Box::new(move |task| eat_routine(game, task)),
        );
    }

    fn on_hazard(&self, signal: &Signal) {
        let mut context = Map::new();
        context.insert("hazard".to_string(), json!(signal.kind.name()));
        if !self.stack.interrupt("Critical", Priority::CRITICAL, context) {
            return;
        }
        let game = Arc::clone(&self.game);
        self.scheduler.schedule(
            "Critical",
            Priority::CRITICAL,
            Box::new(move |task| halt_routine(game, task)),
        );
    }

    /// Record where and why we died, then drop every intention.
    fn on_death(&self, signal: &Signal) {
        let position = self.game.position();
        let retry_count = load_recovery_state(&self.state_dir)
            .ok()
            .flatten()
            .map(|s| s.retry_count)
            .unwrap_or(0);
        let state = RecoveryState {
            position: PositionRecord::from(position),
            dimension: signal
                .payload_str("dimension")
                .unwrap_or("overworld")
                .to_string(),
            timestamp: self.clock.epoch_ms(),
            cause: signal.payload_str("cause").unwrap_or("unknown").to_string(),
            recoverable: true,
            retry_count,
        };
        if let Err(e) = save_recovery_state(&self.state_dir, &state) {
            tracing::warn!(error = %e, "failed to persist death state");
        }
        self.scheduler.stop_all();
        self.stack.reset();
    }

    /// Walk back to the death site, if there is one worth returning to.
    fn on_spawn(&self, _signal: &Signal) {
        let state = match load_recovery_state(&self.state_dir) {
            Ok(Some(state)) => state,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = %e, "unreadable recovery state on spawn");
                return;
            }
        };
        if !state.recoverable || state.retry_count >= MAX_RECOVERY_RETRIES {
            tracing::info!(retries = state.retry_count, "abandoning death-site recovery");
            remove_recovery_state(&self.state_dir);
            return;
        }
        let bumped = RecoveryState { retry_count: state.retry_count + 1, ..state.clone() };
        if let Err(e) = save_recovery_state(&self.state_dir, &bumped) {
            tracing::warn!(error = %e, "failed to bump recovery retry count");
        }

        let mut context = Map::new();
        context.insert("cause".to_string(), json!(state.cause));
        self.stack.push("Recover", Priority::TASK, context);
        let game = Arc::clone(&self.game);
        let state_dir = self.state_dir.clone();
        let goal = Position::from(state.position);
        self.scheduler.schedule(
            "Recover",
            Priority::TASK,
            Box::new(move |task| recover_routine(game, task, goal, state_dir)),
        );
    }

    fn on_override(&self, _signal: &Signal) {
        tracing::info!("human override: cancelling all tasks");
        self.scheduler.stop_all();
        self.stack.reset();
    }
}

fn combat_routine<G: GameFacade + 'static>(game: Arc<G>, task: TaskContext) -> TaskFuture {
    Box::pin(async move {
        game.equip("sword", "hand").await.map_err(|e| e.to_string())?;
        task.checkpoint().await.map_err(|e| e.to_string())?;
        game.set_control("forward", true).await.map_err(|e| e.to_string())?;
        task.checkpoint().await.map_err(|e| e.to_string())?;
        game.set_control("forward", false).await.map_err(|e| e.to_string())?;
        Ok(json!({"engaged": true}))
    })
}

fn retreat_routine<G: GameFacade + 'static>(game: Arc<G>, task: TaskContext) -> TaskFuture {
    Box::pin(async move {
        for axis in ["forward", "left", "right"] {
            game.set_control(axis, false).await.map_err(|e| e.to_string())?;
        }
        game.set_control("back", true).await.map_err(|e| e.to_string())?;
        task.checkpoint().await.map_err(|e| e.to_string())?;
        game.set_control("back", false).await.map_err(|e| e.to_string())?;
        game.equip("shield", "offhand").await.map_err(|e| e.to_string())?;
        Ok(json!({"retreated": true}))
    })
}

fn eat_routine<G: GameFacade + 'static>(game: Arc<G>, task: TaskContext) -> TaskFuture {
    Box::pin(async move {
        game.equip("bread", "hand").await.map_err(|e| e.to_string())?;
        task.checkpoint().await.map_err(|e| e.to_string())?;
        Ok(json!({"ate": "bread"}))
    })
}

fn halt_routine<G: GameFacade + 'static>(game: Arc<G>, task: TaskContext) -> TaskFuture {
    Box::pin(async move {
        game.set_control("forward", false).await.map_err(|e| e.to_string())?;
        task.checkpoint().await.map_err(|e| e.to_string())?;
        game.set_control("back", true).await.map_err(|e| e.to_string())?;
        game.set_control("back", false).await.map_err(|e| e.to_string())?;
        Ok(json!({"halted": true}))
    })
}

fn recover_routine<G: GameFacade + 'static>(
    game: Arc<G>,
    task: TaskContext,
    goal: Position,
    state_dir: PathBuf,
) -> TaskFuture {
    Box::pin(async move {
        game.pathfind(goal).await.map_err(|e| e.to_string())?;
        task.checkpoint().await.map_err(|e| e.to_string())?;
        remove_recovery_state(&state_dir);
        Ok(json!({"recovered_at": {"x": goal.x, "y": goal.y, "z": goal.z}}))
    })
}

#[cfg(test)]
#[path = "reflexes_tests.rs"]
mod tests;
