// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Central wiring: one registry of shared handles so components borrow
//! each other instead of owning each other. The bus is the decoupling
//! backbone; nothing here holds a mutable reference to anything else.

use crate::bus::SignalBus;
use crate::game::GameFacade;
use crate::reflexes::install_static_reflexes;
use crate::registry::ReflexRegistry;
use crate::scheduler::Scheduler;
use golem_core::{Clock, SignalKind, StateStack};
use golem_library::{LibraryConfig, RollbackManager, SkillLibrary};
use golem_memory::{BridgeConfig, HashEmbedder, MemoryBridge, VectorStore};
use golem_mind::SelfPrompter;
use golem_sandbox::{CodeSandbox, SafetySandwich, SandboxConfig};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("library init failed: {0}")]
    Library(#[from] golem_library::LibraryError),
    #[error("io error during wiring: {0}")]
    Io(#[from] std::io::Error),
}

/// Knobs resolved by the startup shell (env + profiles).
#[derive(Debug, Clone)]
pub struct ServicesConfig {
    /// Root state directory; `library/`, `backups/` and
    /// `reflex_state.json` live beneath it.
    pub state_dir: PathBuf,
    /// `INSECURE_CODING`: disable the sandbox static scan (debug only).
    pub insecure_coding: bool,
    /// `BLOCKED_ACTIONS`: task names refused at dispatch.
    pub blocked_actions: HashSet<String>,
    pub memory: BridgeConfig,
    pub strict_metadata: bool,
    /// Logical partition for episodic memory, fixed per game session.
    pub world_id: Uuid,
}

/// Shared handles for every subsystem of one agent.
pub struct AgentServices<G: GameFacade + 'static, C: Clock> {
    pub clock: C,
    pub config: ServicesConfig,
    pub bus: Arc<SignalBus<C>>,
    pub stack: Arc<StateStack<C>>,
    pub registry: Arc<ReflexRegistry<C>>,
    pub scheduler: Arc<Scheduler<C>>,
    pub sandbox: Arc<CodeSandbox>,
    pub sandwich: Arc<SafetySandwich>,
    pub library: Arc<SkillLibrary<C>>,
    pub rollback: Arc<RollbackManager<C>>,
    pub memory: Arc<MemoryBridge<C>>,
    pub game: Arc<G>,
    pub prompter: Arc<SelfPrompter>,
}

impl<G: GameFacade + 'static, C: Clock> AgentServices<G, C> {
    /// Build and cross-wire every subsystem.
    pub async fn wire(config: ServicesConfig, game: Arc<G>, clock: C) -> Result<Arc<Self>, WireError> {
        let bus = Arc::new(SignalBus::new(clock.clone()));
        let sink = bus.sink();

        let stack = Arc::new(StateStack::with_sink(clock.clone(), Arc::clone(&sink)));
        let scheduler = Arc::new(Scheduler::new(
            Arc::clone(&stack),
            clock.clone(),
            config.blocked_actions.clone(),
        ));

        let sandbox = Arc::new(CodeSandbox::new(SandboxConfig {
            insecure: config.insecure_coding,
            ..SandboxConfig::default()
        }));
        let sandwich = Arc::new(SafetySandwich::new(config.insecure_coding));

        let library = Arc::new(
            SkillLibrary::open(
                LibraryConfig {
                    library_dir: config.state_dir.join("library"),
                    strict_metadata: config.strict_metadata,
                },
                clock.clone(),
            )
            .await?
            .with_sink(Arc::clone(&sink)),
        );
        let rollback = Arc::new(RollbackManager::new(
            Arc::clone(&library),
            config.state_dir.join("backups"),
            clock.clone(),
            Some(Arc::clone(&sink)),
        )?);
        library.set_add_observer(Arc::clone(&rollback) as Arc<dyn golem_library::AddObserver>);

        // Skill outcomes drain into the rollback manager off the bus.
        let rollback_tx = rollback.spawn_pump();
        for kind in [SignalKind::SkillSuccess, SignalKind::SkillFailed] {
            let tx = rollback_tx.clone();
            bus.subscribe(kind, move |signal| {
                let _ = tx.send(signal.clone());
                Ok(())
            });
        }

        let memory = Arc::new(MemoryBridge::new(
            config.memory.clone(),
            Arc::new(VectorStore::new(Box::new(HashEmbedder::default()))),
            clock.clone(),
        ));

        let registry = Arc::new(ReflexRegistry::new(
            clock.clone(),
            Arc::clone(&sandbox),
            Some(Arc::clone(&sink)),
        ));
        // The registry sees every signal; its own trigger tables decide
        // what fires.
        for kind in SignalKind::ALL {
            let registry = Arc::clone(&registry);
            bus.subscribe(kind, move |signal| {
                registry.handle_signal(signal);
                Ok(())
            });
        }

        // Stack changes re-evaluate the running task at its next
        // suspension point.
        {
            let scheduler = Arc::clone(&scheduler);
            bus.subscribe(SignalKind::StateChanged, move |_| {
                scheduler.notify_preempt();
                Ok(())
            });
        }

        install_static_reflexes(
            &registry,
            Arc::clone(&stack),
            Arc::clone(&scheduler),
            Arc::clone(&game),
            config.state_dir.clone(),
            clock.clone(),
        );

        Ok(Arc::new(Self {
            clock,
            config,
            bus,
            stack,
            registry,
            scheduler,
            sandbox,
            sandwich,
            library,
            rollback,
            memory,
            game,
            prompter: Arc::new(SelfPrompter::new()),
        }))
    }
}

#[cfg(test)]
#[path = "services_tests.rs"]
mod tests;
