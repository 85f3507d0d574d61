// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A degraded failure rate automatically restores the previous
//! version of a skill and announces the revert.

use super::support;
use golem_core::{Signal, SignalKind};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn degraded_skill_rolls_back_to_the_previous_version() {
    let agent = support::agent().await;
    let services = &agent.services;

    // v1 is accepted, then v2 replaces it; the backup holds v1.
    services.library.add("smelt", "function smelt() { return 'iron_v1'; }", "smelts ore", &[]).await.unwrap();
    services.library.add("smelt", "function smelt() { return 'iron_v2'; }", "smelts ore", &[]).await.unwrap();
    assert!(agent.dir.path().join("backups/smelt.bak").exists());

    // Watch for the revert announcement.
    let reverted: Arc<parking_lot::Mutex<Vec<Signal>>> =
        Arc::new(parking_lot::Mutex::new(Vec::new()));
    {
        let reverted = Arc::clone(&reverted);
        services.bus.subscribe(SignalKind::RuleReverted, move |s| {
            reverted.lock().push(s.clone());
            Ok(())
        });
    }

    // One success, then five failures: 5/6 >= 0.8 with >= 5 trials.
    services.bus.emit(SignalKind::SkillSuccess, json!({"name": "smelt"}));
    for _ in 0..5 {
        services.bus.emit(SignalKind::SkillFailed, json!({"name": "smelt", "error": "timeout"}));
    }
    services.bus.dispatch_pending();

    // The rollback pump is asynchronous; poll until the revert lands.
    let mut restored = false;
    for _ in 0..100 {
        let on_disk =
            std::fs::read_to_string(agent.dir.path().join("library/smelt.skill")).unwrap();
        if on_disk.contains("iron_v1") {
            restored = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(restored, "library/smelt.skill was not restored to v1");

    services.bus.dispatch_pending();
    let reverted = reverted.lock();
    assert_eq!(reverted.len(), 1);
    assert_eq!(reverted[0].payload_str("name"), Some("smelt"));

    // The cache agrees with the restored file.
    assert_eq!(
        services.library.get("smelt").await.unwrap().code,
        "function smelt() { return 'iron_v1'; }"
    );
}

#[tokio::test]
async fn healthy_failure_rates_never_revert() {
    let agent = support::agent().await;
    let services = &agent.services;
    services.library.add("s", "v1();", "", &[]).await.unwrap();
    services.library.add("s", "v2();", "", &[]).await.unwrap();

    for _ in 0..4 {
        services.bus.emit(SignalKind::SkillSuccess, json!({"name": "s"}));
    }
    services.bus.emit(SignalKind::SkillFailed, json!({"name": "s", "error": "hiccup"}));
    services.bus.dispatch_pending();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let on_disk = std::fs::read_to_string(agent.dir.path().join("library/s.skill")).unwrap();
    assert!(on_disk.contains("v2();"));
}
