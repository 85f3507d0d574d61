// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A sanitized busy loop terminates at the wall clock and reports
//! a timeout, and the isolate is always torn down.

use golem_sandbox::{sanitize, CodeSandbox, ExecContext, SandboxConfig};
use std::time::Instant;

#[tokio::test]
async fn sanitized_while_true_times_out_promptly() {
    let sandbox = CodeSandbox::new(SandboxConfig { timeout_ms: 100, insecure: false });
    let code = sanitize("while(true){}", 100);

    let started = Instant::now();
    let outcome = sandbox.execute(&code, ExecContext::default()).await;
    let elapsed = started.elapsed();

    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("Timeout after 100 ms"));
    assert!(elapsed.as_millis() >= 90, "finished suspiciously early: {elapsed:?}");
    assert!(elapsed.as_millis() <= 1000, "interrupt came too late: {elapsed:?}");
}

#[tokio::test]
async fn executions_after_a_timeout_start_clean() {
    let sandbox = CodeSandbox::new(SandboxConfig { timeout_ms: 100, insecure: false });
    let code = sanitize("while(true){}", 100);
    sandbox.execute(&code, ExecContext::default()).await;

    // A fresh isolate serves the next execution.
    let outcome = sandbox.execute("21 * 2", ExecContext::default()).await;
    assert!(outcome.success);
    assert_eq!(outcome.result, Some(serde_json::json!(42)));
}
