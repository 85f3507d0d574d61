// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The agent's planning mind: LLM facade, context assembly, and the
//! self-prompting loop that keeps it busy when idle.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod brain;
mod context;
mod prompter;
mod transport;

pub use brain::{Brain, BrainConfig, BrainError, BUDGET_SENTINEL, DISCONNECTED_SENTINEL};
pub use context::{BotStatus, ContextBundle, ContextInputs, SkillEntry, StrategyInfo};
pub use prompter::{PrompterDirective, PrompterState, SelfPrompter, SWITCH_STRATEGY_DIRECTIVE};
pub use transport::{ChatMessage, ChatTransport, Role, TransportError};
#[cfg(any(test, feature = "test-support"))]
pub use transport::FakeTransport;
