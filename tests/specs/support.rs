// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the scenario suite.

use golem_core::FakeClock;
use golem_memory::BridgeConfig;
use golem_runtime::{AgentServices, FakeGame, GameFacade, ServicesConfig};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;

pub struct Agent {
    pub dir: TempDir,
    pub game: Arc<FakeGame>,
    pub services: Arc<AgentServices<FakeGame, FakeClock>>,
}

/// Bridge config pointed at a dead port: every remote call fails fast.
pub fn offline_bridge() -> BridgeConfig {
    BridgeConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        max_retries: 1,
        backoff: vec![],
        request_timeout: Duration::from_millis(200),
        health_check_interval: Duration::from_secs(60),
        mirror_to_local: true,
    }
}

/// A fully wired agent on a fake clock, fake game, offline memory.
pub async fn agent() -> Agent {
    let dir = TempDir::new().expect("tempdir");
    let clock = FakeClock::new();
    let game = Arc::new(FakeGame::new());
    let services = AgentServices::wire(
        ServicesConfig {
            state_dir: dir.path().to_path_buf(),
            insecure_coding: false,
            blocked_actions: HashSet::new(),
            memory: offline_bridge(),
            strict_metadata: false,
            world_id: Uuid::new_v4(),
        },
        Arc::clone(&game),
        clock.clone(),
    )
    .await
    .expect("wire services");
    Agent { dir, game, services }
}

/// Drive the engine by hand: dispatch signals, run reflex actions, and
/// give the scheduler slices until everything settles.
pub async fn settle(agent: &Agent) {
    let shutdown = tokio_util::sync::CancellationToken::new();
    for _ in 0..64 {
        agent.services.bus.dispatch_pending();
        if agent.services.registry.pending_action_count() > 0 {
            agent
                .services
                .registry
                .execute_pending(agent.game.snapshot())
                .await;
            continue;
        }
        // A short-lived wake keeps a parked-but-gated task from
        // stalling the drive loop.
        let outcome = agent
            .services
            .scheduler
            .run_slice(tokio::time::sleep(Duration::from_millis(5)), &shutdown)
            .await;
        if outcome == golem_runtime::SliceOutcome::Idle && !agent.services.bus.has_pending() {
            break;
        }
    }
}
