// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide typed pub/sub; the single ordering point for all
//! reactive activity.
//!
//! `emit` only enqueues: delivery happens when the engine loop calls
//! `dispatch_pending`, so an emitter can never reentrantly observe its
//! own signal. Handlers run in registration order; one handler's error
//! is logged and never stops the rest.

use golem_core::{Clock, Signal, SignalKind, SignalSink};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Pending signals beyond this are dropped oldest-first.
pub const HIGH_WATERMARK: usize = 4096;

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

type Handler = Arc<dyn Fn(&Signal) -> Result<(), HandlerError> + Send + Sync>;

/// Unsubscribe handle returned by `subscribe`/`once`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    kind: SignalKind,
    id: u64,
}

struct Registration {
    id: u64,
    handler: Handler,
    once: bool,
}

#[derive(Default)]
struct BusStats {
    emitted: HashMap<SignalKind, u64>,
    overflow: u64,
}

pub struct SignalBus<C: Clock> {
    clock: C,
    handlers: Mutex<HashMap<SignalKind, Vec<Registration>>>,
    pending: Mutex<VecDeque<Signal>>,
    stats: Mutex<BusStats>,
    next_id: AtomicU64,
    wake: Notify,
}

impl<C: Clock> SignalBus<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            handlers: Mutex::new(HashMap::new()),
            pending: Mutex::new(VecDeque::new()),
            stats: Mutex::new(BusStats::default()),
            next_id: AtomicU64::new(1),
            wake: Notify::new(),
        }
    }

    pub fn subscribe<F>(&self, kind: SignalKind, handler: F) -> Subscription
    where
        F: Fn(&Signal) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.attach(kind, Arc::new(handler), false)
    }

    /// Auto-unsubscribes after the first invocation.
    pub fn once<F>(&self, kind: SignalKind, handler: F) -> Subscription
    where
        F: Fn(&Signal) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.attach(kind, Arc::new(handler), true)
    }

    fn attach(&self, kind: SignalKind, handler: Handler, once: bool) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers
            .lock()
            .entry(kind)
            .or_default()
            .push(Registration { id, handler, once });
        Subscription { kind, id }
    }

    pub fn unsubscribe(&self, subscription: Subscription) {
        if let Some(list) = self.handlers.lock().get_mut(&subscription.kind) {
            list.retain(|r| r.id != subscription.id);
        }
    }

    /// Enqueue a signal for the next dispatch tick.
    pub fn emit(&self, kind: SignalKind, payload: Value) {
        self.enqueue(Signal::new(kind, payload, self.clock.epoch_ms()));
    }

    /// Enqueue a pre-stamped signal (used by sinks).
    pub fn enqueue(&self, signal: Signal) {
        {
            let mut pending = self.pending.lock();
            let mut stats = self.stats.lock();
            *stats.emitted.entry(signal.kind).or_insert(0) += 1;
            if pending.len() >= HIGH_WATERMARK {
                let dropped = pending.pop_front();
                stats.overflow += 1;
                if let Some(dropped) = dropped {
                    tracing::warn!(
                        kind = %dropped.kind,
                        overflow = stats.overflow,
                        "signal bus overflow, dropping oldest"
                    );
                }
            }
            pending.push_back(signal);
        }
        self.wake.notify_one();
    }

    /// A sink other components can hold without owning the bus.
    pub fn sink(self: &Arc<Self>) -> SignalSink {
        let bus = Arc::clone(self);
        Arc::new(move |signal| bus.enqueue(signal))
    }

    /// Resolves once signals are waiting. Returns immediately if some
    /// already are.
    pub async fn wait_pending(&self) {
        if !self.pending.lock().is_empty() {
            return;
        }
        self.wake.notified().await;
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.lock().is_empty()
    }

    /// Deliver everything queued so far. Returns how many signals were
    /// dispatched. Signals enqueued by handlers during this call are
    /// delivered in the same drain, after the current batch.
    pub fn dispatch_pending(&self) -> usize {
        let mut dispatched = 0;
        loop {
            let Some(signal) = self.pending.lock().pop_front() else {
                break;
            };
            dispatched += 1;

            // Snapshot so handlers can subscribe/unsubscribe reentrantly.
            let batch: Vec<(u64, Handler, bool)> = self
                .handlers
                .lock()
                .get(&signal.kind)
                .map(|list| {
                    list.iter()
                        .map(|r| (r.id, Arc::clone(&r.handler), r.once))
                        .collect()
                })
                .unwrap_or_default();

            for (id, handler, once) in batch {
                if once {
                    // Remove before invoking so a second queued signal of
                    // the same kind cannot fire it again.
                    self.unsubscribe(Subscription { kind: signal.kind, id });
                }
                if let Err(e) = handler(&signal) {
                    tracing::error!(
                        kind = %signal.kind,
                        error = %e,
                        payload_type = payload_shape(&signal.payload),
                        "signal handler failed"
                    );
                }
            }
        }
        dispatched
    }

    /// Emit counts per kind.
    pub fn stats(&self) -> HashMap<SignalKind, u64> {
        self.stats.lock().emitted.clone()
    }

    pub fn overflow_count(&self) -> u64 {
        self.stats.lock().overflow
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }
}

fn payload_shape(payload: &Value) -> &'static str {
    match payload {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
