// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wires the planning mind onto a running agent: brain, skill
//! synthesis, and the self-prompting loop.

use crate::lifecycle::Config;
use golem_core::{Clock, SignalKind};
use golem_mind::{Brain, ChatMessage, ChatTransport, SelfPrompter};
use golem_runtime::{AgentServices, GameFacade, SkillSynthesizer};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct MindHandles<T: ChatTransport + 'static, C: Clock> {
    pub brain: Arc<Brain<T, C>>,
    pub synthesizer: Arc<SkillSynthesizer<T, C>>,
}

/// Attach a transport-backed mind to the agent.
///
/// Subscribes the synthesis pump to `CodeRequest` signals and starts
/// the self-prompter driver (it stays dormant until `start` is called
/// on the prompter).
pub fn attach_mind<G, T, C>(
    config: &Config,
    services: &Arc<AgentServices<G, C>>,
    transport: T,
    shutdown: CancellationToken,
) -> MindHandles<T, C>
where
    G: GameFacade + 'static,
    T: ChatTransport + 'static,
    C: Clock,
{
    let brain = Arc::new(Brain::new(
        transport,
        services.clock.clone(),
        config.brain_config(),
        Arc::clone(&services.memory),
        Arc::clone(&services.library),
    ));

    let synthesizer = Arc::new(SkillSynthesizer::new(
        Arc::clone(&brain),
        Arc::clone(&services.sandwich),
        Arc::clone(&services.library),
        Some(services.bus.sink()),
        services.clock.clone(),
        config.world_id,
    ));
    let synthesis_tx = Arc::clone(&synthesizer).spawn_pump();
    services.bus.subscribe(SignalKind::CodeRequest, move |signal| {
        let _ = synthesis_tx.send(signal.clone());
        Ok(())
    });

    spawn_prompter_driver(Arc::clone(&services.prompter), Arc::clone(&brain), shutdown);

    MindHandles { brain, synthesizer }
}

/// Background task running the self-prompting loop whenever the
/// prompter is active.
fn spawn_prompter_driver<T: ChatTransport + 'static, C: Clock>(
    prompter: Arc<SelfPrompter>,
    brain: Arc<Brain<T, C>>,
    shutdown: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(std::time::Duration::from_millis(500)) => {}
            }
            if prompter.state() != golem_mind::PrompterState::Active {
                continue;
            }
            let brain = Arc::clone(&brain);
            prompter
                .run(shutdown.clone(), move |prompt| {
                    let brain = Arc::clone(&brain);
                    async move { brain.chat(vec![ChatMessage::system(prompt)]).await }
                })
                .await;
        }
    });
}

#[cfg(test)]
#[path = "mind_tests.rs"]
mod tests;
