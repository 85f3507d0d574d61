// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A detected threat preempts the running task at its next
//! suspension point and hands control back afterwards.

use super::support;
use golem_core::{Priority, SignalKind};
use golem_runtime::SliceOutcome;
use serde_json::{json, Map};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn threat_preempts_gather_and_returns() {
    let agent = support::agent().await;
    let services = &agent.services;
    let shutdown = CancellationToken::new();

    // A long-running gather task is mid-flight.
    services.stack.push("Gather", Priority::TASK, Map::new());
    let gate = Arc::new(Notify::new());
    {
        let gate = Arc::clone(&gate);
        services.scheduler.schedule(
            "Gather",
            Priority::TASK,
            Box::new(move |ctx| {
                Box::pin(async move {
                    gate.notified().await;
                    ctx.checkpoint().await.map_err(|e| e.to_string())?;
                    Ok(json!({"gathered": "wood"}))
                })
            }),
        );
    }
    services.bus.dispatch_pending();

    // Drive the gather slice; inject the threat while it is suspended.
    let slice = services.scheduler.run_slice(std::future::pending(), &shutdown);
    tokio::pin!(slice);
    tokio::select! {
        biased;
        _ = &mut slice => panic!("gather must still be running"),
        _ = tokio::task::yield_now() => {}
    }
    services
        .bus
        .emit(SignalKind::ThreatDetected, json!({"entity": "zombie", "amount": 5}));

    // Dispatching from outside does not touch the stack until the bus
    // drains; draining fires the combat reflex.
    services.bus.dispatch_pending();
    assert_eq!(services.stack.current().name, "Combat");
    assert_eq!(services.stack.current().priority, Priority::COMBAT);

    // The suspended gather task parks at its next suspension point.
    assert_eq!(slice.await, SliceOutcome::Parked);
    let snapshot = services.stack.snapshot();
    assert_eq!(snapshot[1].name, "Gather");
    assert!(snapshot[1].paused_at_ms.is_some());

    // Combat routine runs to completion and pops back to Gather.
    support::settle(&agent).await;
    assert_eq!(services.stack.current().name, "Gather");
    assert!(services.stack.current().paused_at_ms.is_none());
    assert!(agent.game.calls().contains(&"equip:sword:hand".to_string()));

    // Gather resumes from where it parked and finishes.
    gate.notify_one();
    support::settle(&agent).await;
    assert_eq!(services.stack.current().name, "Idle");
    let history = services.scheduler.history();
    assert!(history.iter().any(|r| r.name == "Combat" && r.success));
    assert!(history
        .iter()
        .any(|r| r.name == "Gather" && r.result == json!({"gathered": "wood"})));
}
