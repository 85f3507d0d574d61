// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use golem_core::FakeClock;
use serde_json::json;

fn bus() -> Arc<SignalBus<FakeClock>> {
    Arc::new(SignalBus::new(FakeClock::new()))
}

fn collector(bus: &SignalBus<FakeClock>, kind: SignalKind) -> Arc<Mutex<Vec<Signal>>> {
    let seen: Arc<Mutex<Vec<Signal>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_in = Arc::clone(&seen);
    bus.subscribe(kind, move |s| {
        seen_in.lock().push(s.clone());
        Ok(())
    });
    seen
}

#[test]
fn emit_defers_until_dispatch() {
    let bus = bus();
    let seen = collector(&bus, SignalKind::Hungry);

    bus.emit(SignalKind::Hungry, json!({"food": 4}));
    assert!(seen.lock().is_empty(), "emit must not deliver synchronously");

    assert_eq!(bus.dispatch_pending(), 1);
    assert_eq!(seen.lock().len(), 1);
    assert_eq!(seen.lock()[0].payload_num("food"), Some(4.0));
}

#[test]
fn handlers_fire_in_registration_order() {
    let bus = bus();
    let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    for name in ["first", "second", "third"] {
        let order = Arc::clone(&order);
        bus.subscribe(SignalKind::Spawn, move |_| {
            order.lock().push(name);
            Ok(())
        });
    }
    bus.emit(SignalKind::Spawn, json!({}));
    bus.dispatch_pending();
    assert_eq!(order.lock().as_slice(), ["first", "second", "third"]);
}

#[test]
fn a_failing_handler_does_not_stop_the_rest() {
    let bus = bus();
    bus.subscribe(SignalKind::Death, |_| Err(HandlerError("handler exploded".to_string())));
    let seen = collector(&bus, SignalKind::Death);

    bus.emit(SignalKind::Death, json!({"cause": "creeper"}));
    bus.dispatch_pending();
    assert_eq!(seen.lock().len(), 1);
}

#[test]
fn once_fires_exactly_once_even_with_two_queued() {
    let bus = bus();
    let count = Arc::new(Mutex::new(0u32));
    let count_in = Arc::clone(&count);
    bus.once(SignalKind::Spawn, move |_| {
        *count_in.lock() += 1;
        Ok(())
    });

    bus.emit(SignalKind::Spawn, json!({}));
    bus.emit(SignalKind::Spawn, json!({}));
    bus.dispatch_pending();
    assert_eq!(*count.lock(), 1);
}

#[test]
fn unsubscribe_detaches() {
    let bus = bus();
    let count = Arc::new(Mutex::new(0u32));
    let count_in = Arc::clone(&count);
    let sub = bus.subscribe(SignalKind::Hungry, move |_| {
        *count_in.lock() += 1;
        Ok(())
    });

    bus.emit(SignalKind::Hungry, json!({}));
    bus.dispatch_pending();
    bus.unsubscribe(sub);
    bus.emit(SignalKind::Hungry, json!({}));
    bus.dispatch_pending();
    assert_eq!(*count.lock(), 1);
}

#[test]
fn handlers_may_emit_reentrantly() {
    let bus = bus();
    {
        let bus_in = Arc::clone(&bus);
        bus.subscribe(SignalKind::ThreatDetected, move |_| {
            bus_in.emit(SignalKind::StateChanged, json!({"current": "Combat"}));
            Ok(())
        });
    }
    let seen = collector(&bus, SignalKind::StateChanged);

    bus.emit(SignalKind::ThreatDetected, json!({}));
    // Both the original and the handler-emitted signal drain in one call.
    assert_eq!(bus.dispatch_pending(), 2);
    assert_eq!(seen.lock().len(), 1);
}

#[test]
fn fifo_across_signals() {
    let bus = bus();
    let order: Arc<Mutex<Vec<SignalKind>>> = Arc::new(Mutex::new(Vec::new()));
    for kind in [SignalKind::HealthLow, SignalKind::Hungry] {
        let order = Arc::clone(&order);
        bus.subscribe(kind, move |s| {
            order.lock().push(s.kind);
            Ok(())
        });
    }
    bus.emit(SignalKind::Hungry, json!({}));
    bus.emit(SignalKind::HealthLow, json!({}));
    bus.dispatch_pending();
    assert_eq!(order.lock().as_slice(), [SignalKind::Hungry, SignalKind::HealthLow]);
}

#[test]
fn overflow_drops_oldest_and_counts() {
    let bus = bus();
    for i in 0..(HIGH_WATERMARK + 10) {
        bus.emit(SignalKind::BlockChange, json!({"seq": i}));
    }
    assert_eq!(bus.pending_len(), HIGH_WATERMARK);
    assert_eq!(bus.overflow_count(), 10);

    // The oldest ten were dropped: the first delivered is seq=10.
    let seen = collector(&bus, SignalKind::BlockChange);
    bus.dispatch_pending();
    assert_eq!(seen.lock()[0].payload_num("seq"), Some(10.0));
}

#[test]
fn stats_count_emits_per_kind() {
    let bus = bus();
    bus.emit(SignalKind::Hungry, json!({}));
    bus.emit(SignalKind::Hungry, json!({}));
    bus.emit(SignalKind::Death, json!({}));
    let stats = bus.stats();
    assert_eq!(stats.get(&SignalKind::Hungry), Some(&2));
    assert_eq!(stats.get(&SignalKind::Death), Some(&1));
}

#[tokio::test]
async fn wait_pending_wakes_on_emit() {
    let bus = bus();
    let waiter = {
        let bus = Arc::clone(&bus);
        tokio::spawn(async move {
            bus.wait_pending().await;
        })
    };
    tokio::task::yield_now().await;
    bus.emit(SignalKind::Spawn, json!({}));
    waiter.await.unwrap();
}
