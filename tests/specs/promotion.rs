// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pushing an active state promotes it instead of duplicating it.

use super::support;
use golem_core::{Priority, SignalKind};
use serde_json::{json, Map, Value};

fn ctx(key: &str, value: Value) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    map
}

#[tokio::test]
async fn pushing_an_active_state_promotes_and_merges() {
    let agent = support::agent().await;
    let stack = &agent.services.stack;

    stack.push("Build", Priority::TASK, ctx("plan", json!("hut")));
    agent.services.bus.dispatch_pending();
    let state_changes_before = agent.services.bus.stats()[&SignalKind::StateChanged];

    assert!(stack.push("Build", Priority::TASK, ctx("plan", json!("tower"))));

    // Depth unchanged, context merged, no duplicate entry.
    assert_eq!(stack.depth(), 2);
    let top = stack.current();
    assert_eq!(top.name, "Build");
    assert_eq!(top.context.get("plan"), Some(&json!("tower")));
    assert_eq!(stack.snapshot().iter().filter(|s| s.name == "Build").count(), 1);

    // Exactly one StateChanged for the promotion.
    agent.services.bus.dispatch_pending();
    let state_changes_after = agent.services.bus.stats()[&SignalKind::StateChanged];
    assert_eq!(state_changes_after - state_changes_before, 1);
}

#[tokio::test]
async fn promotion_lifts_a_buried_state_to_the_top() {
    let agent = support::agent().await;
    let stack = &agent.services.stack;

    stack.push("Build", Priority::TASK, ctx("plan", json!("hut")));
    stack.push("Scout", Priority::TASK, Map::new());
    assert_eq!(stack.current().name, "Scout");

    stack.push("Build", Priority::TASK, Map::new());
    assert_eq!(stack.current().name, "Build");
    assert_eq!(stack.current().context.get("plan"), Some(&json!("hut")));
    assert_eq!(stack.depth(), 3);
}
