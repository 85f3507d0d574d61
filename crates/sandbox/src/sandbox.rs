// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Capability-reduced executor for untrusted code.
//!
//! Each execution gets a fresh QuickJS runtime with a 64 MiB memory
//! cap and an interrupt handler enforcing the wall clock. The global
//! surface is the engine's own builtins plus `log(...)`, a deep-copied
//! `bot` mock and deep-copied `context` data; there is no module
//! loader, no host filesystem, no host timers beyond `Date.now`.

use crate::scan::{scan_host_access, ScanHit};
use parking_lot::Mutex;
use rquickjs::{CatchResultExt, CaughtError, Context, Ctx, Function, Runtime, Value};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Hard memory cap per isolate.
const MEMORY_LIMIT_BYTES: usize = 64 * 1024 * 1024;

/// Default wall clock for plain executions. The admission pipeline
/// uses a tighter 2000 ms.
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone)]
pub struct SandboxConfig {
    pub timeout_ms: u64,
    /// Skip the pre-flight static scan (`INSECURE_CODING`, debug only).
    pub insecure: bool,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self { timeout_ms: DEFAULT_TIMEOUT_MS, insecure: false }
    }
}

/// Data exposed to the isolate. Both values are serialized to JSON and
/// re-parsed inside the engine, so the isolate only ever sees copies.
#[derive(Debug, Clone, Default)]
pub struct ExecContext {
    pub bot: serde_json::Value,
    pub context_data: serde_json::Value,
}

/// Result of one sandboxed execution.
#[derive(Debug, Clone, Serialize)]
pub struct ExecOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<String>,
}

impl ExecOutcome {
    fn failure(error: String) -> Self {
        Self { success: false, result: None, error: Some(error), logs: Vec::new() }
    }
}

/// One named validation check.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationCheck {
    pub name: &'static str,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub checks: Vec<ValidationCheck>,
    pub duration_ms: u64,
}

pub struct CodeSandbox {
    config: SandboxConfig,
}

impl CodeSandbox {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    pub fn timeout_ms(&self) -> u64 {
        self.config.timeout_ms
    }

    /// Execute `source` against a reduced capability surface.
    ///
    /// Host-access tokens are rejected up front; loop spellings are not,
    /// since the wall clock bounds them regardless of sanitization.
    pub async fn execute(&self, source: &str, context: ExecContext) -> ExecOutcome {
        if !self.config.insecure {
            let hits = scan_host_access(source);
            if !hits.is_empty() {
                return ExecOutcome::failure(forbidden_message(&hits));
            }
        }
        let timeout_ms = self.config.timeout_ms;
        let sources = vec![source.to_string()];
        run_blocking(sources, context, timeout_ms).await
    }

    /// Syntax-and-scan validation; never runs the code.
    pub fn validate(&self, source: &str) -> ValidationReport {
        let started = Instant::now();
        let mut checks = Vec::new();

        let hits = if self.config.insecure { Vec::new() } else { scan_host_access(source) };
        let tokens_ok = hits.is_empty();
        checks.push(ValidationCheck {
            name: "forbidden_tokens",
            passed: tokens_ok,
            detail: if tokens_ok { None } else { Some(forbidden_message(&hits)) },
        });

        let syntax = if tokens_ok { check_syntax(source) } else { None };
        let syntax_ok = tokens_ok && syntax.is_none();
        checks.push(ValidationCheck { name: "syntax", passed: syntax_ok, detail: syntax });

        ValidationReport {
            valid: checks.iter().all(|c| c.passed),
            checks,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Define `body`, then execute `test`, in the same isolate.
    pub async fn run_test(&self, body: &str, test: &str, context: ExecContext) -> ExecOutcome {
        if !self.config.insecure {
            let mut hits = scan_host_access(body);
            hits.extend(scan_host_access(test));
            if !hits.is_empty() {
                return ExecOutcome::failure(forbidden_message(&hits));
            }
        }
        let sources = vec![body.to_string(), test.to_string()];
        run_blocking(sources, context, self.config.timeout_ms).await
    }
}

fn forbidden_message(hits: &[ScanHit]) -> String {
    let reasons: Vec<&str> = hits.iter().map(|h| h.reason).collect();
    format!("Forbidden tokens [{}]", reasons.join(", "))
}

/// Isolates run on the blocking pool so the cooperative executor is
/// never stalled by a busy loop waiting for its interrupt.
async fn run_blocking(
    sources: Vec<String>,
    context: ExecContext,
    timeout_ms: u64,
) -> ExecOutcome {
    match tokio::task::spawn_blocking(move || run_isolate(&sources, &context, timeout_ms)).await {
        Ok(outcome) => outcome,
        Err(join_err) => ExecOutcome::failure(format!("sandbox worker failed: {join_err}")),
    }
}

/// Run sources in order inside one fresh isolate.
///
/// The runtime and context are locals, so every exit path disposes the
/// isolate when they drop.
fn run_isolate(sources: &[String], exec: &ExecContext, timeout_ms: u64) -> ExecOutcome {
    let started = Instant::now();
    let deadline = started + Duration::from_millis(timeout_ms);

    let runtime = match Runtime::new() {
        Ok(rt) => rt,
        Err(e) => return ExecOutcome::failure(format!("engine init failed: {e}")),
    };
    runtime.set_memory_limit(MEMORY_LIMIT_BYTES);
    runtime.set_interrupt_handler(Some(Box::new(move || Instant::now() >= deadline)));

    let context = match Context::full(&runtime) {
        Ok(ctx) => ctx,
        Err(e) => return ExecOutcome::failure(format!("engine init failed: {e}")),
    };

    let logs: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let log_sink = Arc::clone(&logs);

    let evaluated: Result<Option<serde_json::Value>, String> = context.with(|ctx| {
        install_surface(&ctx, exec, log_sink)?;
        let mut last = None;
        for source in sources {
            let result = ctx.eval::<Value, _>(source.as_bytes()).catch(&ctx);
            match result {
                Ok(value) => last = to_json(&ctx, value),
                Err(caught) => return Err(caught_message(&caught)),
            }
        }
        Ok(last)
    });

    // The log closure inside the context still holds its Arc clone.
    let logs = logs.lock().clone();
    match evaluated {
        Ok(result) => ExecOutcome { success: true, result, error: None, logs },
        Err(message) => {
            let error = if Instant::now() >= deadline
                || message.contains("interrupted")
                || message.contains("Timeout after")
            {
                format!("Timeout after {timeout_ms} ms")
            } else {
                message
            };
            ExecOutcome { success: false, result: None, error: Some(error), logs }
        }
    }
}

/// Install `log`, `bot` and `context` on the isolate's globals.
fn install_surface<'js>(
    ctx: &Ctx<'js>,
    exec: &ExecContext,
    log_sink: Arc<Mutex<Vec<String>>>,
) -> Result<(), String> {
    let globals = ctx.globals();

    let log_fn = Function::new(ctx.clone(), move |message: String| {
        log_sink.lock().push(message);
    })
    .map_err(|e| format!("engine init failed: {e}"))?;
    globals.set("log", log_fn).map_err(|e| format!("engine init failed: {e}"))?;

    for (name, value) in [("bot", &exec.bot), ("context", &exec.context_data)] {
        let json = serde_json::to_string(value).unwrap_or_else(|_| "null".to_string());
        let parsed = ctx
            .json_parse(json)
            .map_err(|e| format!("engine init failed: {e}"))?;
        globals.set(name, parsed).map_err(|e| format!("engine init failed: {e}"))?;
    }
    Ok(())
}

/// JSON round-trip a JS value back to the host. `undefined` and
/// unserializable values become `None`.
fn to_json<'js>(ctx: &Ctx<'js>, value: Value<'js>) -> Option<serde_json::Value> {
    if value.is_undefined() {
        return None;
    }
    let text = ctx.json_stringify(value).ok()??;
    let text = text.to_string().ok()?;
    serde_json::from_str(&text).ok()
}

fn caught_message(caught: &CaughtError<'_>) -> String {
    match caught {
        CaughtError::Exception(exception) => exception
            .message()
            .unwrap_or_else(|| "uncaught exception".to_string()),
        CaughtError::Value(value) => format!("uncaught value: {value:?}"),
        CaughtError::Error(error) => error.to_string(),
    }
}

/// Compile-only syntax check: the source is wrapped in a function body
/// that is never invoked. Returns the parse error, if any.
fn check_syntax(source: &str) -> Option<String> {
    let runtime = Runtime::new().ok()?;
    runtime.set_memory_limit(MEMORY_LIMIT_BYTES);
    let context = Context::full(&runtime).ok()?;
    context.with(|ctx| {
        let wrapped = format!("void function() {{\n{source}\n}};");
        match ctx.eval::<Value, _>(wrapped.as_bytes()).catch(&ctx) {
            Ok(_) => None,
            Err(caught) => Some(caught_message(&caught)),
        }
    })
}

#[cfg(test)]
#[path = "sandbox_tests.rs"]
mod tests;
