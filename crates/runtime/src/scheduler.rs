// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cooperative task dispatch under state-stack supervision.
//!
//! The scheduler only ever drives the task whose name matches the top
//! of the stack. A preempted task's future is parked, not dropped, and
//! resumes when its state is on top again. Nothing is interrupted
//! mid-synchronous-block: switches happen at suspension points only.

use golem_core::{Clock, Priority, StateStack};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("task cancelled")]
pub struct TaskCancelled;

/// Handed to every task; carries the implicit cancel token.
#[derive(Clone)]
pub struct TaskContext {
    cancel: CancellationToken,
}

impl TaskContext {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Explicit cancellation checkpoint for long synchronous stretches.
    pub fn check_interrupt(&self) -> Result<(), TaskCancelled> {
        if self.cancel.is_cancelled() {
            Err(TaskCancelled)
        } else {
            Ok(())
        }
    }

    /// Suspension point: yields to the executor and observes the cancel
    /// flag, as every task should after each await.
    pub async fn checkpoint(&self) -> Result<(), TaskCancelled> {
        tokio::task::yield_now().await;
        self.check_interrupt()
    }
}

pub type TaskFuture = Pin<Box<dyn Future<Output = Result<Value, String>> + Send>>;
pub type TaskFn = Box<dyn FnOnce(TaskContext) -> TaskFuture + Send>;

/// Completed-task history entry.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRecord {
    pub name: String,
    pub success: bool,
    pub result: Value,
    pub end_time_ms: u64,
}

/// What one scheduling slice did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceOutcome {
    /// No task matches the current state.
    Idle,
    /// The running task was parked (preemption or external wake).
    Parked,
    /// A task ran to completion.
    Completed,
    /// Shutdown was requested mid-run.
    Shutdown,
}

struct QueuedTask {
    make: TaskFn,
}

struct ParkedTask {
    future: TaskFuture,
    cancel: CancellationToken,
}

pub struct Scheduler<C: Clock> {
    stack: Arc<StateStack<C>>,
    clock: C,
    queued: Mutex<IndexMap<String, QueuedTask>>,
    parked: Mutex<HashMap<String, ParkedTask>>,
    preempt: Notify,
    history: Mutex<Vec<TaskRecord>>,
    /// Action names refused at dispatch (`BLOCKED_ACTIONS`).
    blocked: HashSet<String>,
}

impl<C: Clock> Scheduler<C> {
    pub fn new(stack: Arc<StateStack<C>>, clock: C, blocked: HashSet<String>) -> Self {
        Self {
            stack,
            clock,
            queued: Mutex::new(IndexMap::new()),
            parked: Mutex::new(HashMap::new()),
            preempt: Notify::new(),
            history: Mutex::new(Vec::new()),
            blocked,
        }
    }

    /// Queue a task for the named state. A task with the same name
    /// coalesces to the most recent. Returns `false` for blocked names.
    pub fn schedule(&self, name: &str, priority: Priority, task: TaskFn) -> bool {
        if self.blocked.contains(name) {
            tracing::warn!(task = name, "refusing blocked action");
            return false;
        }
        // A re-schedule supersedes a parked older run as well.
        if let Some(old) = self.parked.lock().remove(name) {
            old.cancel.cancel();
        }
        tracing::debug!(task = name, priority = priority.0, "task scheduled");
        self.queued.lock().insert(name.to_string(), QueuedTask { make: task });
        self.preempt.notify_one();
        true
    }

    /// Wake the current slice so it re-reads the stack top.
    pub fn notify_preempt(&self) {
        self.preempt.notify_one();
    }

    /// Cancel every queued and parked task.
    pub fn stop_all(&self) {
        self.queued.lock().clear();
        let mut parked = self.parked.lock();
        for (_, task) in parked.drain() {
            task.cancel.cancel();
        }
        self.preempt.notify_one();
    }

    pub fn history(&self) -> Vec<TaskRecord> {
        self.history.lock().clone()
    }

    pub fn has_work(&self) -> bool {
        !self.queued.lock().is_empty() || !self.parked.lock().is_empty()
    }

    /// Drive the task matching the top state until it completes, parks,
    /// or `wake` resolves (bus activity, tick, shutdown).
    ///
    /// The slice is the only place task futures are polled, so all
    /// component mutation stays on one logical executor.
    pub async fn run_slice<W>(&self, wake: W, shutdown: &CancellationToken) -> SliceOutcome
    where
        W: Future<Output = ()>,
    {
        let top = self.stack.current();
        let Some((name, mut future, cancel)) = self.take_task_for(&top.name) else {
            return SliceOutcome::Idle;
        };

        tokio::pin!(wake);
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    self.park(&name, future, cancel);
                    return SliceOutcome::Shutdown;
                }
                result = &mut future => {
                    self.complete(&name, result);
                    return SliceOutcome::Completed;
                }
                _ = &mut wake => {
                    self.park(&name, future, cancel);
                    return SliceOutcome::Parked;
                }
                _ = self.preempt.notified() => {
                    if self.stack.current().name != name {
                        self.park(&name, future, cancel);
                        return SliceOutcome::Parked;
                    }
                    // Same state still on top; keep driving.
                }
            }
        }
    }

    fn take_task_for(&self, name: &str) -> Option<(String, TaskFuture, CancellationToken)> {
        if let Some(parked) = self.parked.lock().remove(name) {
            return Some((name.to_string(), parked.future, parked.cancel));
        }
        let queued = self.queued.lock().shift_remove(name)?;
        let cancel = CancellationToken::new();
        let context = TaskContext { cancel: cancel.clone() };
        let future = (queued.make)(context);
        Some((name.to_string(), future, cancel))
    }

    fn park(&self, name: &str, future: TaskFuture, cancel: CancellationToken) {
        self.parked.lock().insert(name.to_string(), ParkedTask { future, cancel });
    }

    fn complete(&self, name: &str, result: Result<Value, String>) {
        let (success, value) = match result {
            Ok(value) => (true, value),
            Err(error) => (false, Value::String(error)),
        };
        // Pop the state this task was serving. The stack refuses to pop
        // Idle, and a top that moved on is left alone.
        if self.stack.current().name == name {
            self.stack.complete(success, value.clone());
        }
        self.history.lock().push(TaskRecord {
            name: name.to_string(),
            success,
            result: value,
            end_time_ms: self.clock.epoch_ms(),
        });
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
