// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::game::FakeGame;
use golem_core::FakeClock;
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;

async fn wired(dir: &TempDir) -> Arc<AgentServices<FakeGame, FakeClock>> {
    let config = ServicesConfig {
        state_dir: dir.path().to_path_buf(),
        insecure_coding: false,
        blocked_actions: HashSet::new(),
        memory: BridgeConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            max_retries: 1,
            backoff: vec![],
            request_timeout: Duration::from_millis(100),
            health_check_interval: Duration::from_secs(60),
            mirror_to_local: true,
        },
        strict_metadata: false,
        world_id: Uuid::new_v4(),
    };
    AgentServices::wire(config, Arc::new(FakeGame::new()), FakeClock::new())
        .await
        .unwrap()
}

#[tokio::test]
async fn bus_dispatch_reaches_the_reflex_registry() {
    let dir = TempDir::new().unwrap();
    let services = wired(&dir).await;

    services
        .bus
        .emit(SignalKind::ThreatDetected, json!({"entity": "zombie", "distance": 3}));
    assert_eq!(services.stack.current().name, "Idle", "delivery must be deferred");

    services.bus.dispatch_pending();
    assert_eq!(services.stack.current().name, "Combat");
    assert!(services.scheduler.has_work());
}

#[tokio::test]
async fn state_changes_flow_back_through_the_bus() {
    let dir = TempDir::new().unwrap();
    let services = wired(&dir).await;

    services.stack.push("Gather", golem_core::Priority::TASK, serde_json::Map::new());
    services.bus.dispatch_pending();
    let stats = services.bus.stats();
    assert_eq!(stats.get(&SignalKind::StateChanged), Some(&1));
}

#[tokio::test]
async fn library_adds_are_backed_up_through_the_wired_observer() {
    let dir = TempDir::new().unwrap();
    let services = wired(&dir).await;

    services.library.add("s", "v1();", "", &[]).await.unwrap();
    services.library.add("s", "v2();", "", &[]).await.unwrap();
    assert!(dir.path().join("backups/s.bak").exists());
}

#[tokio::test]
async fn skill_failed_signals_reach_the_rollback_manager() {
    let dir = TempDir::new().unwrap();
    let services = wired(&dir).await;
    services.library.add("s", "v1();", "", &[]).await.unwrap();
    services.library.add("s", "v2();", "", &[]).await.unwrap();

    services.bus.emit(SignalKind::SkillFailed, json!({"name": "s", "error": "timeout"}));
    services.bus.dispatch_pending();

    // The pump is async; poll until the health record lands.
    for _ in 0..50 {
        if services.rollback.health_of("s").map(|h| h.failures) == Some(1) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("rollback manager never observed the failure");
}

#[tokio::test]
async fn blocked_actions_come_from_config() {
    let dir = TempDir::new().unwrap();
    let config = ServicesConfig {
        state_dir: dir.path().to_path_buf(),
        insecure_coding: false,
        blocked_actions: ["griefing".to_string()].into_iter().collect(),
        memory: BridgeConfig::new("http://127.0.0.1:9"),
        strict_metadata: false,
        world_id: Uuid::new_v4(),
    };
    let services = AgentServices::wire(config, Arc::new(FakeGame::new()), FakeClock::new())
        .await
        .unwrap();
    assert!(!services.scheduler.schedule(
        "griefing",
        golem_core::Priority::TASK,
        Box::new(|_| Box::pin(async { Ok(serde_json::Value::Null) })),
    ));
}
