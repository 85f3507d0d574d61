// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn path_resolution_walks_objects_and_arrays() {
    let payload = json!({
        "entity": {"kind": "creeper", "pos": {"y": 63.5}},
        "drops": [{"item": "gunpowder"}],
    });
    assert_eq!(get_by_path(&payload, "entity.kind"), Some(&json!("creeper")));
    assert_eq!(get_by_path(&payload, "entity.pos.y"), Some(&json!(63.5)));
    assert_eq!(get_by_path(&payload, "drops.0.item"), Some(&json!("gunpowder")));
    assert_eq!(get_by_path(&payload, "entity.missing"), None);
    assert_eq!(get_by_path(&payload, "drops.one.item"), None);
}

#[yare::parameterized(
    gt_holds    = { PredicateOp::Gt,  json!(3),   true },
    gt_equal    = { PredicateOp::Gt,  json!(5),   false },
    lt_holds    = { PredicateOp::Lt,  json!(10),  true },
    gte_equal   = { PredicateOp::Gte, json!(5),   true },
    lte_above   = { PredicateOp::Lte, json!(4),   false },
    eq_holds    = { PredicateOp::Eq,  json!(5),   true },
    eq_float    = { PredicateOp::Eq,  json!(5.0), true },
    neq_holds   = { PredicateOp::Neq, json!(6),   true },
)]
fn numeric_predicates(op: PredicateOp, value: serde_json::Value, expected: bool) {
    let pred = Predicate { path: "health".to_string(), op, value };
    assert_eq!(pred.holds(&json!({"health": 5})), expected);
}

#[test]
fn string_equality() {
    let pred = Predicate {
        path: "entity.kind".to_string(),
        op: PredicateOp::Eq,
        value: json!("zombie"),
    };
    assert!(pred.holds(&json!({"entity": {"kind": "zombie"}})));
    assert!(!pred.holds(&json!({"entity": {"kind": "skeleton"}})));
}

#[test]
fn missing_path_never_matches() {
    let pred = Predicate { path: "absent".to_string(), op: PredicateOp::Neq, value: json!(1) };
    assert!(!pred.holds(&json!({"present": 1})));
}

#[test]
fn ordering_op_on_non_number_is_false() {
    let pred = Predicate { path: "name".to_string(), op: PredicateOp::Gt, value: json!(3) };
    assert!(!pred.holds(&json!({"name": "steve"})));
}

#[test]
fn reflex_def_round_trips() {
    let def = DynamicReflexDef {
        id: "flee_creeper".to_string(),
        trigger: ReflexTrigger {
            signal_kind: crate::SignalKind::ThreatDetected,
            conditions: vec![Predicate {
                path: "distance".to_string(),
                op: PredicateOp::Lt,
                value: json!(6),
            }],
        },
        action: "bot.setControl('back', true);".to_string(),
    };
    let text = serde_json::to_string(&def).unwrap();
    let back: DynamicReflexDef = serde_json::from_str(&text).unwrap();
    assert_eq!(back, def);
}
