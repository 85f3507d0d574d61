// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The reactive core: signal bus, reflex registry, cooperative
//! scheduler, game facade, and the wiring that ties the agent's
//! subsystems together.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod bus;
mod game;
mod recovery;
mod reflexes;
mod registry;
mod scheduler;
mod services;
mod synthesis;

pub use bus::{HandlerError, SignalBus, Subscription, HIGH_WATERMARK};
pub use game::{FakeGame, GameError, GameFacade, Position};
pub use recovery::{
    load_recovery_state, remove_recovery_state, save_recovery_state, PositionRecord,
    RecoveryError, RecoveryState, RECOVERY_FILE,
};
pub use reflexes::install_static_reflexes;
pub use registry::{PendingAction, ReflexRegistry, RegistryError, TransientOutcome};
pub use scheduler::{Scheduler, SliceOutcome, TaskCancelled, TaskContext, TaskFn, TaskRecord};
pub use services::{AgentServices, ServicesConfig, WireError};
pub use synthesis::{CodeRequest, SkillSynthesizer, SynthesisError};
