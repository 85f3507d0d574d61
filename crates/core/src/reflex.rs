// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reflex definitions: triggers, predicates, stats.

use crate::signal::SignalKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison applied by a trigger predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateOp {
    Gt,
    Lt,
    Gte,
    Lte,
    Eq,
    Neq,
}

/// A single condition evaluated against a signal payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    /// Dotted path into the payload, e.g. `entity.distance`.
    pub path: String,
    pub op: PredicateOp,
    pub value: Value,
}

impl Predicate {
    /// True when the payload field at `path` satisfies the comparison.
    /// A missing path never matches.
    pub fn holds(&self, payload: &Value) -> bool {
        let Some(actual) = get_by_path(payload, &self.path) else {
            return false;
        };
        match self.op {
            PredicateOp::Eq => values_equal(actual, &self.value),
            PredicateOp::Neq => !values_equal(actual, &self.value),
            PredicateOp::Gt | PredicateOp::Lt | PredicateOp::Gte | PredicateOp::Lte => {
                let (Some(a), Some(b)) = (actual.as_f64(), self.value.as_f64()) else {
                    return false;
                };
                match self.op {
                    PredicateOp::Gt => a > b,
                    PredicateOp::Lt => a < b,
                    PredicateOp::Gte => a >= b,
                    PredicateOp::Lte => a <= b,
                    _ => false,
                }
            }
        }
    }
}

/// Numbers compare numerically so `5` matches `5.0`; everything else
/// compares structurally.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Resolve a dotted path against a JSON value. Array segments may be
/// numeric indices.
pub fn get_by_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut cursor = value;
    for segment in path.split('.') {
        cursor = match cursor {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(cursor)
}

/// What fires a dynamic reflex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReflexTrigger {
    pub signal_kind: SignalKind,
    /// All conditions must hold; evaluation short-circuits on the first
    /// false predicate.
    #[serde(default)]
    pub conditions: Vec<Predicate>,
}

/// A runtime-registered reflex whose action body is untrusted code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicReflexDef {
    pub id: String,
    pub trigger: ReflexTrigger,
    /// Source text executed in the sandbox against a reduced surface
    /// (bot + agent + payload).
    pub action: String,
}

/// Fire statistics kept per reflex.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflexStats {
    pub success: u64,
    pub fail: u64,
    pub last_fire_ms: Option<u64>,
}

#[cfg(test)]
#[path = "reflex_tests.rs"]
mod tests;
