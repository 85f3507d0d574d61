// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use golem_core::FakeClock;
use serde_json::{json, Map};
use std::future::pending;

fn fixture() -> (Arc<StateStack<FakeClock>>, Scheduler<FakeClock>) {
    let clock = FakeClock::new();
    let stack = Arc::new(StateStack::new(clock.clone()));
    let scheduler = Scheduler::new(Arc::clone(&stack), clock, HashSet::new());
    (stack, scheduler)
}

fn immediate(result: Value) -> TaskFn {
    Box::new(move |_ctx| Box::pin(async move { Ok(result) }))
}

/// A task that stays pending until `gate` is notified, then succeeds.
fn gated(gate: Arc<Notify>) -> TaskFn {
    Box::new(move |ctx| {
        Box::pin(async move {
            gate.notified().await;
            ctx.checkpoint().await.map_err(|e| e.to_string())?;
            Ok(json!("done"))
        })
    })
}

#[tokio::test]
async fn idle_when_no_task_matches_the_top() {
    let (_stack, scheduler) = fixture();
    let outcome = scheduler.run_slice(pending(), &CancellationToken::new()).await;
    assert_eq!(outcome, SliceOutcome::Idle);
}

#[tokio::test]
async fn completing_a_task_pops_its_state_and_records_history() {
    let (stack, scheduler) = fixture();
    stack.push("Gather", Priority::TASK, Map::new());
    scheduler.schedule("Gather", Priority::TASK, immediate(json!({"wood": 12})));

    let outcome = scheduler.run_slice(pending(), &CancellationToken::new()).await;
    assert_eq!(outcome, SliceOutcome::Completed);
    assert_eq!(stack.current().name, "Idle");

    let history = scheduler.history();
    assert_eq!(history.len(), 1);
    assert!(history[0].success);
    assert_eq!(history[0].result, json!({"wood": 12}));
}

#[tokio::test]
async fn failing_task_records_a_failure_entry() {
    let (stack, scheduler) = fixture();
    stack.push("Gather", Priority::TASK, Map::new());
    scheduler.schedule(
        "Gather",
        Priority::TASK,
        Box::new(|_ctx| Box::pin(async { Err("no axe".to_string()) })),
    );
    scheduler.run_slice(pending(), &CancellationToken::new()).await;

    let history = scheduler.history();
    assert!(!history[0].success);
    assert_eq!(history[0].result, json!("no axe"));
    // Stack history carries the failure too.
    let stack_history = stack.history();
    assert!(!stack_history.last().unwrap().success);
}

#[tokio::test]
async fn preemption_parks_and_resume_finishes() {
    // Gather runs, Combat preempts at a suspension point, and Gather
    // resumes after Combat completes.
    let (stack, scheduler) = fixture();
    stack.push("Gather", Priority::TASK, Map::new());
    let gather_gate = Arc::new(Notify::new());
    scheduler.schedule("Gather", Priority::TASK, gated(Arc::clone(&gather_gate)));

    // Drive Gather; it blocks on its gate, then Combat arrives.
    let cancel_token = CancellationToken::new();
    let slice = scheduler.run_slice(pending(), &cancel_token);
    tokio::pin!(slice);
    tokio::select! {
        biased;
        _ = &mut slice => panic!("gather should not complete yet"),
        _ = tokio::task::yield_now() => {}
    }
    stack.push("Combat", Priority::COMBAT, Map::new());
    scheduler.schedule("Combat", Priority::COMBAT, immediate(json!("threat gone")));
    let outcome = slice.await;
    assert_eq!(outcome, SliceOutcome::Parked);
    assert!(stack.current().paused_at_ms.is_none());
    assert_eq!(stack.snapshot()[1].name, "Gather");

    // Next slice runs Combat to completion and pops back to Gather.
    let outcome = scheduler.run_slice(pending(), &CancellationToken::new()).await;
    assert_eq!(outcome, SliceOutcome::Completed);
    assert_eq!(stack.current().name, "Gather");
    assert!(stack.current().paused_at_ms.is_none());

    // Gather resumes from its parked future and finishes.
    gather_gate.notify_one();
    let outcome = scheduler.run_slice(pending(), &CancellationToken::new()).await;
    assert_eq!(outcome, SliceOutcome::Completed);
    assert_eq!(stack.current().name, "Idle");
    assert_eq!(scheduler.history().len(), 2);
}

#[tokio::test]
async fn external_wake_parks_the_running_task() {
    let (stack, scheduler) = fixture();
    stack.push("Gather", Priority::TASK, Map::new());
    scheduler.schedule("Gather", Priority::TASK, gated(Arc::new(Notify::new())));

    let outcome = scheduler
        .run_slice(async { tokio::task::yield_now().await }, &CancellationToken::new())
        .await;
    assert_eq!(outcome, SliceOutcome::Parked);
    assert!(scheduler.has_work());
}

#[tokio::test]
async fn same_name_coalesces_to_the_most_recent() {
    let (stack, scheduler) = fixture();
    stack.push("Build", Priority::TASK, Map::new());
    scheduler.schedule("Build", Priority::TASK, immediate(json!("hut")));
    scheduler.schedule("Build", Priority::TASK, immediate(json!("tower")));

    scheduler.run_slice(pending(), &CancellationToken::new()).await;
    let history = scheduler.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].result, json!("tower"));
}

#[tokio::test]
async fn stop_all_cancels_parked_tasks() {
    let (stack, scheduler) = fixture();
    stack.push("Gather", Priority::TASK, Map::new());
    let gate = Arc::new(Notify::new());
    scheduler.schedule("Gather", Priority::TASK, gated(Arc::clone(&gate)));

    // Park it via an external wake.
    scheduler
        .run_slice(async { tokio::task::yield_now().await }, &CancellationToken::new())
        .await;
    scheduler.stop_all();
    assert!(!scheduler.has_work());
}

#[tokio::test]
async fn cancelled_task_observes_the_flag_at_its_checkpoint() {
    let (stack, scheduler) = fixture();
    stack.push("Gather", Priority::TASK, Map::new());
    let gate = Arc::new(Notify::new());
    scheduler.schedule("Gather", Priority::TASK, gated(Arc::clone(&gate)));

    // Cancel while parked, then let the gate open: the checkpoint fails.
    scheduler
        .run_slice(async { tokio::task::yield_now().await }, &CancellationToken::new())
        .await;
    {
        let parked = scheduler.parked.lock();
        parked.get("Gather").unwrap().cancel.cancel();
    }
    gate.notify_one();
    let outcome = scheduler.run_slice(pending(), &CancellationToken::new()).await;
    assert_eq!(outcome, SliceOutcome::Completed);
    assert!(!scheduler.history()[0].success);
}

#[tokio::test]
async fn blocked_actions_are_refused() {
    let clock = FakeClock::new();
    let stack = Arc::new(StateStack::new(clock.clone()));
    let blocked: HashSet<String> = ["selfDestruct".to_string()].into_iter().collect();
    let scheduler = Scheduler::new(Arc::clone(&stack), clock, blocked);

    assert!(!scheduler.schedule("selfDestruct", Priority::TASK, immediate(json!(null))));
    assert!(scheduler.schedule("dig", Priority::TASK, immediate(json!(null))));
}
