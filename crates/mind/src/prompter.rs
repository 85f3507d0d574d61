// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Self-prompting loop driving autonomous activity while idle.

use crate::brain::DISCONNECTED_SENTINEL;
use parking_lot::Mutex;
use std::time::Duration;

const COOLDOWN: Duration = Duration::from_millis(3500);
const FAILURE_PENALTY: Duration = Duration::from_millis(1500);
const STUCK_LIMIT: u32 = 3;
const DEGRADED_LIMIT: u32 = 2;
const EMPTY_LIMIT: u32 = 3;

/// Directive appended to the prompt after the agent repeats itself.
pub const SWITCH_STRATEGY_DIRECTIVE: &str =
    "You have repeated the same response. Abandon the current approach and try a different strategy.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrompterState {
    Stopped,
    Active,
    Paused,
}

/// What the loop should do with the latest response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrompterDirective {
    Continue,
    /// Three identical responses in a row: inject the strategy-switch
    /// directive into the next prompt.
    SwitchStrategy,
    /// Provider looks down; hold until someone resumes us.
    Pause,
    /// Nothing is coming back; stop and surface a notice.
    Stop { notice: String },
}

#[derive(Default)]
struct Counters {
    last_response: Option<String>,
    identical_streak: u32,
    disconnected_streak: u32,
    empty_streak: u32,
    provider_failures: u32,
}

pub struct SelfPrompter {
    state: Mutex<PrompterState>,
    prompt: Mutex<Option<String>>,
    counters: Mutex<Counters>,
}

impl SelfPrompter {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PrompterState::Stopped),
            prompt: Mutex::new(None),
            counters: Mutex::new(Counters::default()),
        }
    }

    pub fn state(&self) -> PrompterState {
        *self.state.lock()
    }

    pub fn start(&self, prompt: impl Into<String>) {
        *self.prompt.lock() = Some(prompt.into());
        *self.counters.lock() = Counters::default();
        *self.state.lock() = PrompterState::Active;
    }

    pub fn pause(&self) {
        *self.state.lock() = PrompterState::Paused;
    }

    pub fn stop(&self) {
        *self.state.lock() = PrompterState::Stopped;
        *self.prompt.lock() = None;
    }

    pub fn prompt(&self) -> Option<String> {
        self.prompt.lock().clone()
    }

    /// Delay before the next synthetic prompt: the base cooldown plus a
    /// penalty per provider failure.
    pub fn cooldown(&self) -> Duration {
        let failures = self.counters.lock().provider_failures;
        COOLDOWN + FAILURE_PENALTY * failures
    }

    /// Feed one brain response through the detectors. Also applies the
    /// resulting state transition.
    pub fn observe_response(&self, response: &str) -> PrompterDirective {
        let mut counters = self.counters.lock();

        if response.trim().is_empty() {
            counters.empty_streak += 1;
            counters.identical_streak = 0;
            counters.disconnected_streak = 0;
            if counters.empty_streak >= EMPTY_LIMIT {
                drop(counters);
                self.stop();
                let notice =
                    "Self-prompting stopped: the brain returned nothing three times in a row."
                        .to_string();
                tracing::warn!("{notice}");
                return PrompterDirective::Stop { notice };
            }
            return PrompterDirective::Continue;
        }
        counters.empty_streak = 0;

        if response.contains(DISCONNECTED_SENTINEL) {
            counters.disconnected_streak += 1;
            counters.provider_failures += 1;
            counters.identical_streak = 0;
            if counters.disconnected_streak >= DEGRADED_LIMIT {
                drop(counters);
                self.pause();
                return PrompterDirective::Pause;
            }
            return PrompterDirective::Continue;
        }
        counters.disconnected_streak = 0;
        counters.provider_failures = 0;

        if counters.last_response.as_deref() == Some(response) {
            counters.identical_streak += 1;
        } else {
            counters.identical_streak = 1;
            counters.last_response = Some(response.to_string());
        }
        if counters.identical_streak >= STUCK_LIMIT {
            counters.identical_streak = 0;
            counters.last_response = None;
            return PrompterDirective::SwitchStrategy;
        }
        PrompterDirective::Continue
    }

    /// Drive the loop until stopped, paused, or cancelled. `step` sends
    /// one synthetic message to the brain and returns its response.
    pub async fn run<F, Fut>(&self, cancel: tokio_util::sync::CancellationToken, mut step: F)
    where
        F: FnMut(String) -> Fut,
        Fut: std::future::Future<Output = String>,
    {
        let mut switch_pending = false;
        loop {
            if self.state() != PrompterState::Active {
                break;
            }
            let Some(mut prompt) = self.prompt() else { break };
            if switch_pending {
                switch_pending = false;
                prompt = format!("{prompt}\n\n{SWITCH_STRATEGY_DIRECTIVE}");
            }
            let response = step(prompt).await;
            match self.observe_response(&response) {
                PrompterDirective::Continue => {}
                PrompterDirective::SwitchStrategy => switch_pending = true,
                PrompterDirective::Pause | PrompterDirective::Stop { .. } => break,
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.cooldown()) => {}
            }
        }
    }
}

impl Default for SelfPrompter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "prompter_tests.rs"]
mod tests;
