// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The engine loop.
//!
//! One logical executor turn: drain the bus (reflexes and state-stack
//! updates land here), execute any dynamic reflex actions, then give
//! the scheduler a slice. Tasks are only ever driven between dispatch
//! batches, so no reflex can observe a half-updated stack.

use golem_core::Clock;
use golem_runtime::{AgentServices, GameFacade, SliceOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Drive the agent until `shutdown` fires.
pub async fn run_engine<G: GameFacade + 'static, C: Clock>(
    services: Arc<AgentServices<G, C>>,
    shutdown: CancellationToken,
    tick: Duration,
) {
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        if shutdown.is_cancelled() {
            break;
        }

        // Reflex handlers and state-stack updates run before the
        // scheduler picks its next task.
        services.bus.dispatch_pending();
        if services.registry.pending_action_count() > 0 {
            services.registry.execute_pending(services.game.snapshot()).await;
            // Actions may have emitted follow-up signals; drain again
            // before giving the scheduler a turn.
            continue;
        }

        let wake = async {
            tokio::select! {
                _ = services.bus.wait_pending() => {}
                _ = interval.tick() => {}
            }
        };
        let outcome = services.scheduler.run_slice(wake, &shutdown).await;
        match outcome {
            SliceOutcome::Shutdown => break,
            SliceOutcome::Idle => {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = services.bus.wait_pending() => {}
                    _ = interval.tick() => {}
                }
            }
            SliceOutcome::Parked | SliceOutcome::Completed => {}
        }
    }
    tracing::debug!("engine loop exited");
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
