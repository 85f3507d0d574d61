// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signals delivered through the agent's reactive bus.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Closed set of signal kinds the runtime reacts to.
///
/// Serializes as `snake_case` strings so payload logs and persisted
/// reflex triggers stay readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    HealthLow,
    HealthCritical,
    Hungry,
    ThreatDetected,
    CliffAhead,
    LavaNearby,
    PlayerDetected,
    EntityAction,
    BlockChange,
    Death,
    Spawn,
    StateChanged,
    SocialInteraction,
    HumanOverride,
    CodeRequest,
    CodeGenerated,
    SkillSuccess,
    SkillFailed,
    RuleReverted,
}

impl SignalKind {
    /// Every kind, for components that subscribe across the board.
    pub const ALL: [SignalKind; 19] = [
        SignalKind::HealthLow,
        SignalKind::HealthCritical,
        SignalKind::Hungry,
        SignalKind::ThreatDetected,
        SignalKind::CliffAhead,
        SignalKind::LavaNearby,
        SignalKind::PlayerDetected,
        SignalKind::EntityAction,
        SignalKind::BlockChange,
        SignalKind::Death,
        SignalKind::Spawn,
        SignalKind::StateChanged,
        SignalKind::SocialInteraction,
        SignalKind::HumanOverride,
        SignalKind::CodeRequest,
        SignalKind::CodeGenerated,
        SignalKind::SkillSuccess,
        SignalKind::SkillFailed,
        SignalKind::RuleReverted,
    ];

    /// Stable name used in logs and stats keys.
    pub fn name(&self) -> &'static str {
        match self {
            SignalKind::HealthLow => "health_low",
            SignalKind::HealthCritical => "health_critical",
            SignalKind::Hungry => "hungry",
            SignalKind::ThreatDetected => "threat_detected",
            SignalKind::CliffAhead => "cliff_ahead",
            SignalKind::LavaNearby => "lava_nearby",
            SignalKind::PlayerDetected => "player_detected",
            SignalKind::EntityAction => "entity_action",
            SignalKind::BlockChange => "block_change",
            SignalKind::Death => "death",
            SignalKind::Spawn => "spawn",
            SignalKind::StateChanged => "state_changed",
            SignalKind::SocialInteraction => "social_interaction",
            SignalKind::HumanOverride => "human_override",
            SignalKind::CodeRequest => "code_request",
            SignalKind::CodeGenerated => "code_generated",
            SignalKind::SkillSuccess => "skill_success",
            SignalKind::SkillFailed => "skill_failed",
            SignalKind::RuleReverted => "rule_reverted",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A tagged event delivered by the bus.
///
/// Payloads are structured per-kind but carried as JSON so dynamic
/// reflex predicates can address them by dotted path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,
    pub payload: Value,
    /// Milliseconds since the Unix epoch at emit time.
    pub timestamp_ms: u64,
}

impl Signal {
    pub fn new(kind: SignalKind, payload: Value, timestamp_ms: u64) -> Self {
        Self { kind, payload, timestamp_ms }
    }

    /// Payload field `name` as a string, if present.
    pub fn payload_str(&self, name: &str) -> Option<&str> {
        self.payload.get(name).and_then(Value::as_str)
    }

    /// Payload field `name` as an f64, if present.
    pub fn payload_num(&self, name: &str) -> Option<f64> {
        self.payload.get(name).and_then(Value::as_f64)
    }
}

/// Sink through which components emit signals without owning the bus.
///
/// The bus installs itself here; core types (e.g. the state stack) only
/// ever enqueue, so emitters can never reentrantly observe delivery.
pub type SignalSink = Arc<dyn Fn(Signal) + Send + Sync>;

#[cfg(test)]
#[path = "signal_tests.rs"]
mod tests;
