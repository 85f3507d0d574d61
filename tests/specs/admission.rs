// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The admission pipeline rejects forbidden tokens at the static
//! layer with a precise reason.

use golem_sandbox::SafetySandwich;

#[tokio::test]
async fn forbidden_process_access_fails_static_analysis() {
    let sandwich = SafetySandwich::new(false);
    let verdict = sandwich
        .validate("async function x(){ process.exit(1); }", None)
        .await;

    assert!(!verdict.valid);
    assert!(!verdict.layers.static_check);
    assert!(!verdict.layers.logical);
    assert_eq!(verdict.layers.behavioral, None);
    assert_eq!(
        verdict.reasoning,
        "Static Analysis Failed: Forbidden tokens [Access to process is forbidden]"
    );
}

#[tokio::test]
async fn clean_skill_passes_every_requested_layer() {
    let sandwich = SafetySandwich::new(false);
    let verdict = sandwich
        .validate(
            "function countLogs(bot) { return bot.inventory.length; }",
            Some("if (typeof countLogs !== 'function') throw new Error('missing');"),
        )
        .await;
    assert!(verdict.valid);
    assert!(verdict.layers.static_check);
    assert!(verdict.layers.logical);
    assert_eq!(verdict.layers.behavioral, Some(true));
}
