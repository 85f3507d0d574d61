// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! With the memory service offline, store and recall keep working
//! through the local vector store.

use super::support;
use golem_core::FakeClock;
use golem_memory::{HashEmbedder, MemoryBridge, VectorStore};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

fn offline_bridge() -> MemoryBridge<FakeClock> {
    MemoryBridge::new(
        support::offline_bridge(),
        Arc::new(VectorStore::new(Box::new(HashEmbedder::default()))),
        FakeClock::new(),
    )
}

#[tokio::test]
async fn store_and_recall_survive_an_outage() {
    let bridge = offline_bridge();
    let world = Uuid::new_v4();

    let stored = bridge.store(world, &["hello".to_string()], json!({})).await;
    assert!(stored.success);
    assert!(stored.fallback);
    assert_eq!(stored.stored, 1);

    let recalled = bridge.recall(world, "hello", 5).await;
    assert!(recalled.success);
    assert!(recalled.fallback);
    assert!(recalled.results.contains(&"hello".to_string()));
    assert!(bridge.stats().fallback >= 2);
}

#[tokio::test]
async fn recall_never_crosses_worlds() {
    let bridge = offline_bridge();
    let world_a = Uuid::new_v4();
    let world_b = Uuid::new_v4();

    bridge.store(world_a, &["diamonds at y=-58".to_string()], json!({})).await;
    bridge.store(world_b, &["diamonds are a myth".to_string()], json!({})).await;

    let recalled = bridge.recall(world_a, "diamonds", 10).await;
    assert_eq!(recalled.results, vec!["diamonds at y=-58".to_string()]);
}

#[tokio::test]
async fn the_wired_agent_uses_its_fallback_transparently() {
    let agent = super::support::agent().await;
    let world = agent.services.config.world_id;

    let stored = agent
        .services
        .memory
        .store(world, &["built a bridge over the ravine".to_string()], json!({}))
        .await;
    assert!(stored.fallback);

    let recalled = agent.services.memory.recall(world, "bridge ravine", 3).await;
    assert_eq!(recalled.results.len(), 1);
}
