// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Facade over the game client.
//!
//! Reflexes and tasks only ever see this trait; the network adapter is
//! the one concrete implementation outside tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("game action failed: {0}")]
    Action(String),
    #[error("game client disconnected")]
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[async_trait]
pub trait GameFacade: Send + Sync {
    fn position(&self) -> Position;
    fn health(&self) -> f64;
    fn inventory(&self) -> Vec<(String, u32)>;

    async fn dig(&self, block: &str) -> Result<(), GameError>;
    async fn place(&self, block: &str, reference: &str) -> Result<(), GameError>;
    async fn look(&self, yaw: f64, pitch: f64) -> Result<(), GameError>;
    async fn equip(&self, item: &str, slot: &str) -> Result<(), GameError>;
    async fn chat(&self, text: &str) -> Result<(), GameError>;
    async fn set_control(&self, axis: &str, on: bool) -> Result<(), GameError>;
    async fn pathfind(&self, goal: Position) -> Result<(), GameError>;

    /// Capability-reduced snapshot handed to sandboxed code as `bot`.
    fn snapshot(&self) -> Value {
        let position = self.position();
        json!({
            "health": self.health(),
            "position": {"x": position.x, "y": position.y, "z": position.z},
            "inventory": self
                .inventory()
                .into_iter()
                .map(|(item, count)| json!({"item": item, "count": count}))
                .collect::<Vec<_>>(),
        })
    }
}

/// Scriptable in-memory game: records every action. Used by tests and
/// by the daemon's dry-run mode when no adapter is attached.
pub struct FakeGame {
    pub state: Mutex<FakeGameState>,
    pub calls: Mutex<Vec<String>>,
}

pub struct FakeGameState {
    pub position: Position,
    pub health: f64,
    pub inventory: Vec<(String, u32)>,
}

impl FakeGame {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeGameState {
                position: Position::default(),
                health: 20.0,
                inventory: Vec::new(),
            }),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_health(&self, health: f64) {
        self.state.lock().health = health;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }
}

impl Default for FakeGame {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GameFacade for FakeGame {
    fn position(&self) -> Position {
        self.state.lock().position
    }

    fn health(&self) -> f64 {
        self.state.lock().health
    }

    fn inventory(&self) -> Vec<(String, u32)> {
        self.state.lock().inventory.clone()
    }

    async fn dig(&self, block: &str) -> Result<(), GameError> {
        self.record(format!("dig:{block}"));
        Ok(())
    }

    async fn place(&self, block: &str, reference: &str) -> Result<(), GameError> {
        self.record(format!("place:{block}:{reference}"));
        Ok(())
    }

    async fn look(&self, yaw: f64, pitch: f64) -> Result<(), GameError> {
        self.record(format!("look:{yaw}:{pitch}"));
        Ok(())
    }

    async fn equip(&self, item: &str, slot: &str) -> Result<(), GameError> {
        self.record(format!("equip:{item}:{slot}"));
        Ok(())
    }

    async fn chat(&self, text: &str) -> Result<(), GameError> {
        self.record(format!("chat:{text}"));
        Ok(())
    }

    async fn set_control(&self, axis: &str, on: bool) -> Result<(), GameError> {
        self.record(format!("control:{axis}:{on}"));
        Ok(())
    }

    async fn pathfind(&self, goal: Position) -> Result<(), GameError> {
        self.record(format!("pathfind:{}:{}:{}", goal.x, goal.y, goal.z));
        self.state.lock().position = goal;
        Ok(())
    }
}
