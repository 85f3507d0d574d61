// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reflex registry: static reflexes, runtime-registered dynamic
//! reflexes, and transient listeners with TTLs.
//!
//! Dynamic action bodies are sanitized and syntax-checked once, at
//! registration. Matching signals enqueue the action; the engine loop
//! executes the queue through the sandbox between dispatch batches.

use golem_core::{Clock, DynamicReflexDef, ReflexStats, Signal, SignalKind, SignalSink};
use golem_sandbox::{sanitize, CodeSandbox, ExecContext};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("reflex action rejected: {0}")]
    InvalidAction(String),
}

/// Native callback attached at startup.
type StaticHandler = Arc<dyn Fn(&Signal) + Send + Sync>;

struct StaticReflex {
    id: String,
    handler: StaticHandler,
}

struct DynamicReflex {
    def: DynamicReflexDef,
    /// Action body with loop guards injected, ready for the sandbox.
    sanitized: String,
    stats: ReflexStats,
}

/// What a transient callback asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientOutcome {
    Keep,
    /// Self-destruct: detach this listener now.
    Remove,
}

type TransientHandler = Arc<dyn Fn(&Signal) -> TransientOutcome + Send + Sync>;

struct Transient {
    handler: TransientHandler,
    expires_at_ms: u64,
    once: bool,
}

/// A dynamic action ready for sandbox execution.
pub struct PendingAction {
    pub reflex_id: String,
    pub code: String,
    pub payload: Value,
}

pub struct ReflexRegistry<C: Clock> {
    clock: C,
    sandbox: Arc<CodeSandbox>,
    sink: Option<SignalSink>,
    statics: Mutex<HashMap<SignalKind, Vec<StaticReflex>>>,
    dynamics: Mutex<HashMap<String, DynamicReflex>>,
    transients: Mutex<HashMap<(String, SignalKind), Transient>>,
    actions: Mutex<VecDeque<PendingAction>>,
}

impl<C: Clock> ReflexRegistry<C> {
    pub fn new(clock: C, sandbox: Arc<CodeSandbox>, sink: Option<SignalSink>) -> Self {
        Self {
            clock,
            sandbox,
            sink,
            statics: Mutex::new(HashMap::new()),
            dynamics: Mutex::new(HashMap::new()),
            transients: Mutex::new(HashMap::new()),
            actions: Mutex::new(VecDeque::new()),
        }
    }

    pub fn register_static<F>(&self, kind: SignalKind, id: &str, handler: F)
    where
        F: Fn(&Signal) + Send + Sync + 'static,
    {
        self.statics
            .lock()
            .entry(kind)
            .or_default()
            .push(StaticReflex { id: id.to_string(), handler: Arc::new(handler) });
    }

    /// Register or hot-swap a dynamic reflex. The action is compiled
    /// here once; a body that fails the static checks never attaches.
    pub fn register_dynamic(&self, def: DynamicReflexDef) -> Result<String, RegistryError> {
        let sanitized = sanitize(&def.action, self.sandbox.timeout_ms());
        let report = self.sandbox.validate(&sanitized);
        if !report.valid {
            let detail = report
                .checks
                .iter()
                .find_map(|c| c.detail.clone())
                .unwrap_or_else(|| "failed validation".to_string());
            return Err(RegistryError::InvalidAction(detail));
        }

        let id = def.id.clone();
        let mut dynamics = self.dynamics.lock();
        if dynamics.remove(&id).is_some() {
            tracing::info!(reflex = %id, "hot-swapping dynamic reflex");
        }
        dynamics.insert(id.clone(), DynamicReflex { def, sanitized, stats: ReflexStats::default() });
        Ok(id)
    }

    pub fn remove_dynamic(&self, id: &str) -> bool {
        self.dynamics.lock().remove(id).is_some()
    }

    pub fn dynamic_ids(&self) -> Vec<String> {
        self.dynamics.lock().keys().cloned().collect()
    }

    pub fn stats_of(&self, id: &str) -> Option<ReflexStats> {
        self.dynamics.lock().get(id).map(|d| d.stats)
    }

    /// Attach a transient listener for `(owner, kind)`, replacing any
    /// existing one under the same key. It detaches when `once` fires,
    /// when the callback asks to be removed, or when the TTL lapses.
    pub fn register_transient<F>(
        &self,
        owner: &str,
        kind: SignalKind,
        ttl_ms: u64,
        once: bool,
        handler: F,
    ) where
        F: Fn(&Signal) -> TransientOutcome + Send + Sync + 'static,
    {
        let expires_at_ms = self.clock.epoch_ms().saturating_add(ttl_ms);
        self.transients.lock().insert(
            (owner.to_string(), kind),
            Transient { handler: Arc::new(handler), expires_at_ms, once },
        );
    }

    pub fn transient_count(&self) -> usize {
        self.transients.lock().len()
    }

    /// Route one signal through every reflex class.
    pub fn handle_signal(&self, signal: &Signal) {
        self.sweep_expired();
        self.run_statics(signal);
        self.run_transients(signal);
        self.match_dynamics(signal);
    }

    fn run_statics(&self, signal: &Signal) {
        let batch: Vec<(String, StaticHandler)> = self
            .statics
            .lock()
            .get(&signal.kind)
            .map(|list| list.iter().map(|r| (r.id.clone(), Arc::clone(&r.handler))).collect())
            .unwrap_or_default();
        for (id, handler) in batch {
            tracing::trace!(reflex = %id, kind = %signal.kind, "static reflex firing");
            handler(signal);
        }
    }

    fn run_transients(&self, signal: &Signal) {
        let batch: Vec<((String, SignalKind), TransientHandler, bool)> = self
            .transients
            .lock()
            .iter()
            .filter(|((_, kind), _)| *kind == signal.kind)
            .map(|(key, t)| (key.clone(), Arc::clone(&t.handler), t.once))
            .collect();
        for (key, handler, once) in batch {
            let outcome = handler(signal);
            if once || outcome == TransientOutcome::Remove {
                self.transients.lock().remove(&key);
            }
        }
    }

    /// Evaluate dynamic triggers; short-circuit on the first false
    /// predicate. Matches enqueue the action for sandbox execution.
    fn match_dynamics(&self, signal: &Signal) {
        let mut matched = Vec::new();
        {
            let dynamics = self.dynamics.lock();
            for reflex in dynamics.values() {
                if reflex.def.trigger.signal_kind != signal.kind {
                    continue;
                }
                let holds = reflex
                    .def
                    .trigger
                    .conditions
                    .iter()
                    .all(|p| p.holds(&signal.payload));
                if holds {
                    matched.push(PendingAction {
                        reflex_id: reflex.def.id.clone(),
                        code: reflex.sanitized.clone(),
                        payload: signal.payload.clone(),
                    });
                }
            }
        }
        if !matched.is_empty() {
            self.actions.lock().extend(matched);
        }
    }

    fn sweep_expired(&self) {
        let now = self.clock.epoch_ms();
        self.transients.lock().retain(|_, t| t.expires_at_ms > now);
    }

    pub fn pending_action_count(&self) -> usize {
        self.actions.lock().len()
    }

    /// Execute every enqueued dynamic action against the sandbox.
    /// `bot` is the capability-reduced snapshot exposed to the body.
    pub async fn execute_pending(&self, bot: Value) -> usize {
        let mut executed = 0;
        loop {
            let Some(action) = self.actions.lock().pop_front() else {
                break;
            };
            executed += 1;

            let context = ExecContext {
                bot: bot.clone(),
                context_data: json!({"payload": action.payload}),
            };
            let outcome = self.sandbox.execute(&action.code, context).await;
            let now = self.clock.epoch_ms();
            {
                let mut dynamics = self.dynamics.lock();
                if let Some(reflex) = dynamics.get_mut(&action.reflex_id) {
                    reflex.stats.last_fire_ms = Some(now);
                    if outcome.success {
                        reflex.stats.success += 1;
                    } else {
                        reflex.stats.fail += 1;
                    }
                }
            }
            if !outcome.success {
                let error = outcome.error.unwrap_or_else(|| "unknown error".to_string());
                tracing::warn!(reflex = %action.reflex_id, error = %error, "dynamic reflex failed");
                if let Some(sink) = &self.sink {
                    sink(Signal::new(
                        SignalKind::SkillFailed,
                        json!({"name": action.reflex_id, "error": error}),
                        now,
                    ));
                }
            }
        }
        executed
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
