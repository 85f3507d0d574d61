// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Three-layer admission pipeline for generated skills.
//!
//! Static (token scan + compile) → Logical (loads without crashing) →
//! Behavioral (caller-supplied test). Stops at the first failing layer.

use crate::sandbox::{CodeSandbox, ExecContext, SandboxConfig};
use crate::scan::scan_full;
use serde::Serialize;

/// Wall clock for the logical and behavioral layers.
const ADMISSION_TIMEOUT_MS: u64 = 2000;

/// Per-layer results. `behavioral` is `None` when no test was supplied
/// (skipped, not passed).
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LayerReport {
    #[serde(rename = "static")]
    pub static_check: bool,
    pub logical: bool,
    pub behavioral: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdmissionVerdict {
    pub valid: bool,
    pub layers: LayerReport,
    pub reasoning: String,
}

impl AdmissionVerdict {
    fn rejected(layers: LayerReport, reasoning: String) -> Self {
        Self { valid: false, layers, reasoning }
    }
}

/// The sole admission path for generated code.
pub struct SafetySandwich {
    sandbox: CodeSandbox,
}

impl SafetySandwich {
    pub fn new(insecure: bool) -> Self {
        Self {
            sandbox: CodeSandbox::new(SandboxConfig {
                timeout_ms: ADMISSION_TIMEOUT_MS,
                insecure,
            }),
        }
    }

    /// Validate `code`, optionally running `test` against it.
    pub async fn validate(&self, code: &str, test: Option<&str>) -> AdmissionVerdict {
        let mut layers = LayerReport { static_check: false, logical: false, behavioral: None };

        // Layer 1: reject before spending any execution time.
        let hits = scan_full(code);
        if !hits.is_empty() {
            let reasons: Vec<&str> = hits.iter().map(|h| h.reason).collect();
            return AdmissionVerdict::rejected(
                layers,
                format!("Static Analysis Failed: Forbidden tokens [{}]", reasons.join(", ")),
            );
        }
        let report = self.sandbox.validate(code);
        if !report.valid {
            let detail = report
                .checks
                .iter()
                .find_map(|c| c.detail.clone())
                .unwrap_or_else(|| "syntax error".to_string());
            return AdmissionVerdict::rejected(
                layers,
                format!("Static Analysis Failed: {detail}"),
            );
        }
        layers.static_check = true;

        // Layer 2: the source must evaluate without crashing on load.
        let outcome = self.sandbox.execute(code, ExecContext::default()).await;
        if !outcome.success {
            let error = outcome.error.unwrap_or_else(|| "unknown error".to_string());
            return AdmissionVerdict::rejected(
                layers,
                format!("Logical Validation Failed: {error}"),
            );
        }
        layers.logical = true;

        // Layer 3: behavioral, only when the caller brought a test.
        match test {
            None => AdmissionVerdict {
                valid: true,
                layers,
                reasoning: "All validation layers passed (behavioral skipped: no test supplied)"
                    .to_string(),
            },
            Some(test) => {
                let outcome = self.sandbox.run_test(code, test, ExecContext::default()).await;
                if !outcome.success {
                    layers.behavioral = Some(false);
                    let error = outcome.error.unwrap_or_else(|| "unknown error".to_string());
                    return AdmissionVerdict::rejected(
                        layers,
                        format!("Behavioral Test Failed: {error}"),
                    );
                }
                layers.behavioral = Some(true);
                AdmissionVerdict {
                    valid: true,
                    layers,
                    reasoning: "All validation layers passed".to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "sandwich_tests.rs"]
mod tests;
