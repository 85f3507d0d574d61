// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Priority-ordered stack of active intentions.

use crate::clock::Clock;
use crate::signal::{Signal, SignalKind, SignalSink};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Maximum number of states that may be active at once.
pub const MAX_DEPTH: usize = 10;

/// Named priority levels. Intermediate values are legal; these are the
/// ones the static reflexes use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(pub u8);

impl Priority {
    pub const IDLE: Priority = Priority(0);
    pub const TASK: Priority = Priority(40);
    pub const SURVIVAL: Priority = Priority(60);
    pub const COMBAT: Priority = Priority(80);
    pub const CRITICAL: Priority = Priority(100);
}

/// An intention on the stack; determines what the scheduler is pursuing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub name: String,
    pub priority: Priority,
    pub context: Map<String, Value>,
    pub start_time_ms: u64,
    /// Set while a higher-priority state sits above this one.
    pub paused_at_ms: Option<u64>,
}

/// History entry recorded when a state leaves the stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    pub name: String,
    pub success: bool,
    pub result: Value,
    pub end_time_ms: u64,
}

struct Inner {
    stack: Vec<State>,
    history: Vec<StateRecord>,
}

/// The agent's intention stack.
///
/// Invariants: the stack is never empty (Idle is the floor); the top
/// state has the highest priority of all active states, ties broken by
/// recency; at most one state per name is active.
pub struct StateStack<C: Clock> {
    inner: Mutex<Inner>,
    clock: C,
    sink: Option<SignalSink>,
}

impl<C: Clock> StateStack<C> {
    pub fn new(clock: C) -> Self {
        Self::build(clock, None)
    }

    /// A stack that emits `StateChanged` through the given sink.
    pub fn with_sink(clock: C, sink: SignalSink) -> Self {
        Self::build(clock, Some(sink))
    }

    fn build(clock: C, sink: Option<SignalSink>) -> Self {
        let idle = State {
            name: "Idle".to_string(),
            priority: Priority::IDLE,
            context: Map::new(),
            start_time_ms: clock.epoch_ms(),
            paused_at_ms: None,
        };
        Self {
            inner: Mutex::new(Inner { stack: vec![idle], history: Vec::new() }),
            clock,
            sink,
        }
    }

    /// Push a state, or promote it if one with the same name is active.
    ///
    /// Returns `false` without mutating anything once `MAX_DEPTH` states
    /// are active. A state of lower priority than the current top is
    /// slotted beneath the states that outrank it, so the top always
    /// holds the highest priority.
    pub fn push(&self, name: &str, priority: Priority, context: Map<String, Value>) -> bool {
        let now = self.clock.epoch_ms();
        {
            let mut inner = self.inner.lock();

            let existing = inner.stack.iter().position(|s| s.name == name);
            if existing.is_none() && inner.stack.len() >= MAX_DEPTH {
                return false;
            }

            let mut state = match existing {
                Some(idx) => {
                    // Promotion: single live entry per name. Merged context
                    // keeps old keys, new keys override.
                    let mut prior = inner.stack.remove(idx);
                    for (k, v) in context {
                        prior.context.insert(k, v);
                    }
                    prior.priority = priority;
                    prior
                }
                None => State {
                    name: name.to_string(),
                    priority,
                    context,
                    start_time_ms: now,
                    paused_at_ms: None,
                },
            };

            // Walk down from the top past anything that strictly outranks
            // the new state; equal priority lands on top (recency wins).
            let mut idx = inner.stack.len();
            while idx > 0 && inner.stack[idx - 1].priority > state.priority {
                idx -= 1;
            }

            let lands_on_top = idx == inner.stack.len();
            if lands_on_top {
                if let Some(top) = inner.stack.last_mut() {
                    top.paused_at_ms = Some(now);
                }
                state.paused_at_ms = None;
            } else {
                state.paused_at_ms = Some(now);
            }
            inner.stack.insert(idx, state);
        }
        self.emit_state_changed();
        true
    }

    /// Pop the top state. Never pops the Idle floor.
    pub fn pop(&self) -> Option<State> {
        let popped = {
            let mut inner = self.inner.lock();
            if inner.stack.len() <= 1 {
                return None;
            }
            let state = inner.stack.pop()?;
            if let Some(top) = inner.stack.last_mut() {
                top.paused_at_ms = None;
            }
            let record = StateRecord {
                name: state.name.clone(),
                success: true,
                result: Value::Null,
                end_time_ms: self.clock.epoch_ms(),
            };
            inner.history.push(record);
            state
        };
        self.emit_state_changed();
        Some(popped)
    }

    /// Remove a state by name wherever it sits in the stack.
    ///
    /// This is the only named removal form; `pop` always takes the top.
    pub fn remove(&self, name: &str) -> Option<State> {
        let removed = {
            let mut inner = self.inner.lock();
            let idx = inner.stack.iter().position(|s| s.name == name)?;
            if idx == 0 {
                // Idle floor stays.
                return None;
            }
            let was_top = idx == inner.stack.len() - 1;
            let state = inner.stack.remove(idx);
            if was_top {
                if let Some(top) = inner.stack.last_mut() {
                    top.paused_at_ms = None;
                }
            }
            state
        };
        self.emit_state_changed();
        Some(removed)
    }

    /// Push only if strictly more urgent than the current top.
    ///
    /// The sole entry point for reflexes.
    pub fn interrupt(&self, name: &str, priority: Priority, context: Map<String, Value>) -> bool {
        if priority <= self.current_priority() {
            return false;
        }
        self.push(name, priority, context)
    }

    /// Pop the top state if it is not Idle, recording the outcome.
    ///
    /// Returns the history record so the scheduler can act on failures.
    pub fn complete(&self, success: bool, result: Value) -> Option<StateRecord> {
        let record = {
            let mut inner = self.inner.lock();
            if inner.stack.len() <= 1 {
                return None;
            }
            let state = inner.stack.pop()?;
            if let Some(top) = inner.stack.last_mut() {
                top.paused_at_ms = None;
            }
            let record = StateRecord {
                name: state.name,
                success,
                result,
                end_time_ms: self.clock.epoch_ms(),
            };
            inner.history.push(record.clone());
            record
        };
        self.emit_state_changed();
        Some(record)
    }

    /// Clear everything above the Idle floor (death/reset path).
    pub fn reset(&self) {
        {
            let mut inner = self.inner.lock();
            inner.stack.truncate(1);
            if let Some(idle) = inner.stack.last_mut() {
                idle.paused_at_ms = None;
            }
        }
        self.emit_state_changed();
    }

    pub fn peek(&self) -> State {
        self.current()
    }

    /// The state the agent is currently pursuing.
    pub fn current(&self) -> State {
        let inner = self.inner.lock();
        // Invariant: never empty.
        inner.stack.last().cloned().unwrap_or_else(|| State {
            name: "Idle".to_string(),
            priority: Priority::IDLE,
            context: Map::new(),
            start_time_ms: 0,
            paused_at_ms: None,
        })
    }

    pub fn current_priority(&self) -> Priority {
        self.inner.lock().stack.last().map(|s| s.priority).unwrap_or(Priority::IDLE)
    }

    pub fn has(&self, name: &str) -> bool {
        self.inner.lock().stack.iter().any(|s| s.name == name)
    }

    pub fn depth(&self) -> usize {
        self.inner.lock().stack.len()
    }

    /// Bottom-to-top snapshot.
    pub fn snapshot(&self) -> Vec<State> {
        self.inner.lock().stack.clone()
    }

    pub fn history(&self) -> Vec<StateRecord> {
        self.inner.lock().history.clone()
    }

    fn emit_state_changed(&self) {
        if let Some(sink) = &self.sink {
            let current = self.current();
            let depth = self.depth();
            sink(Signal::new(
                SignalKind::StateChanged,
                json!({
                    "current": current.name,
                    "priority": current.priority.0,
                    "depth": depth,
                }),
                self.clock.epoch_ms(),
            ));
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
