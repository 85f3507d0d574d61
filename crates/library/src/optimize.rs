// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Optimizer seam. The library schedules optimization for heavily-used
//! skills; what "optimize" means (usually an LLM rewrite through the
//! admission pipeline) is up to the implementation.

use async_trait::async_trait;
use golem_core::Skill;

#[async_trait]
pub trait SkillOptimizer: Send + Sync {
    async fn optimize(&self, skill: Skill) -> Result<(), String>;
}

/// Records which skills were scheduled; for tests.
#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
pub struct RecordingOptimizer {
    pub scheduled: parking_lot::Mutex<Vec<String>>,
    pub notify: tokio::sync::Notify,
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl SkillOptimizer for RecordingOptimizer {
    async fn optimize(&self, skill: Skill) -> Result<(), String> {
        self.scheduled.lock().push(skill.name);
        // notify_one stores a permit, so a waiter that registers late
        // still observes the run.
        self.notify.notify_one();
        Ok(())
    }
}
