// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Forbidden-token scan shared by the sandbox and the admission pipeline.
//!
//! The reject list is closed and versioned: additions bump
//! [`SCAN_VERSION`] so stored verdicts can be invalidated.

/// Version of the reject list.
pub const SCAN_VERSION: u32 = 1;

/// One matched forbidden token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanHit {
    pub token: &'static str,
    pub reason: &'static str,
}

/// Host-access tokens. Rejected everywhere, including plain `execute`,
/// because no sanitization makes them safe.
const HOST_ACCESS: &[(&str, Boundary, &'static str)] = &[
    ("process", Boundary::Word, "Access to process is forbidden"),
    ("require", Boundary::Call, "Module loading is forbidden"),
    ("import ", Boundary::Prefix, "Module loading is forbidden"),
    ("eval", Boundary::Call, "Dynamic evaluation is forbidden"),
    ("Function", Boundary::Call, "The Function constructor is forbidden"),
    ("fs.", Boundary::WordStart, "Filesystem access is forbidden"),
    ("child_process", Boundary::Word, "Child processes are forbidden"),
    (".exit(", Boundary::Prefix, "Process control is forbidden"),
];

/// Unbounded-loop spellings. Rejected at admission only; `execute`
/// relies on the sanitizer guard and the hard wall clock instead, so
/// already-sanitized loops still run (and time out) there.
const UNBOUNDED_LOOPS: &[(&str, Boundary, &'static str)] = &[
    ("while(true)", Boundary::Prefix, "Unbounded while(true) loops are forbidden"),
    ("while (true)", Boundary::Prefix, "Unbounded while(true) loops are forbidden"),
    ("for(;;)", Boundary::Prefix, "Unbounded for(;;) loops are forbidden"),
    ("for (;;)", Boundary::Prefix, "Unbounded for(;;) loops are forbidden"),
];

#[derive(Clone, Copy)]
enum Boundary {
    /// Identifier boundaries on both sides.
    Word,
    /// Identifier boundary before only (the token carries its own
    /// trailing delimiter).
    WordStart,
    /// Identifier boundary before, `(` (after optional spaces) after.
    Call,
    /// Plain substring.
    Prefix,
}

fn is_ident(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

fn matches_at(source: &str, token: &str, boundary: Boundary) -> bool {
    let mut search = 0;
    while let Some(off) = source[search..].find(token) {
        let start = search + off;
        let end = start + token.len();
        search = start + 1;

        let before_ok = start == 0
            || !is_ident(source[..start].chars().next_back().unwrap_or(' '));
        match boundary {
            Boundary::Prefix => return true,
            Boundary::WordStart => {
                if before_ok {
                    return true;
                }
            }
            Boundary::Word => {
                let after_ok = source[end..]
                    .chars()
                    .next()
                    .map(|c| !is_ident(c))
                    .unwrap_or(true);
                if before_ok && after_ok {
                    return true;
                }
            }
            Boundary::Call => {
                let after = source[end..].trim_start();
                if before_ok && after.starts_with('(') {
                    return true;
                }
            }
        }
    }
    false
}

/// First matching token wins; one hit is enough to reject.
fn scan_list(source: &str, list: &[(&'static str, Boundary, &'static str)]) -> Vec<ScanHit> {
    for (token, boundary, reason) in list {
        if matches_at(source, token, *boundary) {
            return vec![ScanHit { token, reason }];
        }
    }
    Vec::new()
}

/// Scan for host-access tokens only. Used by `CodeSandbox::execute`.
pub fn scan_host_access(source: &str) -> Vec<ScanHit> {
    scan_list(source, HOST_ACCESS)
}

/// Full reject list: host access plus unbounded-loop spellings.
/// Used by the admission pipeline's static layer.
pub fn scan_full(source: &str) -> Vec<ScanHit> {
    let hits = scan_list(source, HOST_ACCESS);
    if !hits.is_empty() {
        return hits;
    }
    scan_list(source, UNBOUNDED_LOOPS)
}

#[cfg(test)]
#[path = "scan_tests.rs"]
mod tests;
