// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Budget-rate-limited facade over the chat transport.

use crate::context::ContextBundle;
use crate::transport::{ChatMessage, ChatTransport};
use golem_core::Clock;
use golem_library::SkillLibrary;
use golem_memory::MemoryBridge;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Neutral sentinel returned when the rolling budget is spent.
/// Internal exception text never reaches users.
pub const BUDGET_SENTINEL: &str = "[budget exhausted]";
/// Neutral sentinel returned when the transport fails.
pub const DISCONNECTED_SENTINEL: &str = "[brain disconnected]";

#[derive(Debug, Error)]
pub enum BrainError {
    #[error("request budget exhausted")]
    BudgetExhausted,
    #[error("transport failed: {0}")]
    Transport(String),
}

#[derive(Debug, Clone)]
pub struct BrainConfig {
    /// Requests allowed per rolling window.
    pub limit: u32,
    pub window: Duration,
    /// Planner context caps (`MAX_MESSAGES`, `NUM_EXAMPLES`).
    pub max_messages: usize,
    pub num_examples: usize,
    /// Verbose prompt logging (`LOG_ALL`).
    pub log_all: bool,
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            limit: 200,
            window: Duration::from_secs(12 * 60 * 60),
            max_messages: 32,
            num_examples: 5,
            log_all: false,
        }
    }
}

struct Budget {
    window_start_ms: u64,
    count: u32,
}

pub struct Brain<T: ChatTransport, C: Clock> {
    transport: T,
    clock: C,
    config: BrainConfig,
    memory: Arc<MemoryBridge<C>>,
    library: Arc<SkillLibrary<C>>,
    budget: Mutex<Budget>,
}

impl<T: ChatTransport, C: Clock> Brain<T, C> {
    pub fn new(
        transport: T,
        clock: C,
        config: BrainConfig,
        memory: Arc<MemoryBridge<C>>,
        library: Arc<SkillLibrary<C>>,
    ) -> Self {
        let budget = Budget { window_start_ms: clock.epoch_ms(), count: 0 };
        Self { transport, clock, config, memory, library, budget: Mutex::new(budget) }
    }

    /// Free-form chat. Budget misses and transport failures both come
    /// back as neutral sentinels.
    pub async fn chat(&self, mut messages: Vec<ChatMessage>) -> String {
        if !self.check_budget() {
            return BUDGET_SENTINEL.to_string();
        }
        if messages.len() > self.config.max_messages {
            let excess = messages.len() - self.config.max_messages;
            messages.drain(0..excess);
        }
        self.send(messages).await
    }

    /// Plan against an assembled strategic context.
    pub async fn plan(&self, bundle: &ContextBundle, world_id: Uuid) -> String {
        if !self.check_budget() {
            return BUDGET_SENTINEL.to_string();
        }
        let system = self.enrich_context(bundle, world_id).await;
        let messages =
            vec![ChatMessage::system(system), ChatMessage::user(bundle.query.clone())];
        self.send(messages).await
    }

    /// Generate code. Unlike chat/plan, a spent budget is a hard error:
    /// callers must not mistake a sentinel for source text.
    pub async fn code(&self, prompt: &str, _world_id: Uuid) -> Result<String, BrainError> {
        if !self.check_budget() {
            return Err(BrainError::BudgetExhausted);
        }
        let catalog = self.library.summary().await;
        let user = if catalog.is_empty() {
            prompt.to_string()
        } else {
            format!("{prompt}\n\nExisting skills:\n{catalog}")
        };
        let messages = vec![
            ChatMessage::system("Write a single JavaScript skill function for the bot."),
            ChatMessage::user(user),
        ];
        if self.config.log_all {
            tracing::debug!(messages = ?messages, "code prompt");
        }
        self.transport
            .chat(&messages)
            .await
            .map_err(|e| BrainError::Transport(e.0))
    }

    /// Strategic system prompt plus memory and skill-catalog sections.
    async fn enrich_context(&self, bundle: &ContextBundle, world_id: Uuid) -> String {
        let mut system = bundle.text.clone();
        let recalled = self
            .memory
            .recall(world_id, &bundle.query, self.config.num_examples)
            .await;
        if !recalled.results.is_empty() {
            system.push_str("\n## Relevant memories\n");
            for memory in &recalled.results {
                system.push_str("- ");
                system.push_str(memory);
                system.push('\n');
            }
        }
        let catalog = self.library.summary().await;
        if !catalog.is_empty() {
            system.push_str("\n## Skill catalog\n");
            system.push_str(&catalog);
            system.push('\n');
        }
        system
    }

    async fn send(&self, messages: Vec<ChatMessage>) -> String {
        if self.config.log_all {
            tracing::debug!(messages = ?messages, "prompt");
        }
        match self.transport.chat(&messages).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "transport failed");
                DISCONNECTED_SENTINEL.to_string()
            }
        }
    }

    /// Lazily reset the rolling window, then take one budget slot if
    /// available.
    fn check_budget(&self) -> bool {
        let now = self.clock.epoch_ms();
        let mut budget = self.budget.lock();
        if now.saturating_sub(budget.window_start_ms) >= self.config.window.as_millis() as u64 {
            budget.window_start_ms = now;
            budget.count = 0;
        }
        if budget.count >= self.config.limit {
            return false;
        }
        budget.count += 1;
        true
    }

    pub fn requests_in_window(&self) -> u32 {
        self.budget.lock().count
    }
}

#[cfg(test)]
#[path = "brain_tests.rs"]
mod tests;
