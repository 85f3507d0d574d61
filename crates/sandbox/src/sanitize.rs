// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Loop-timeout injection.
//!
//! A lightweight scanner walks the source, masking out strings,
//! template literals and comments, then patches every `while` / `for` /
//! `do` loop so its body checks a wall-clock deadline before each
//! iteration. Patches are applied in reverse source order so earlier
//! offsets stay valid. Input the scanner cannot make sense of is
//! returned unchanged; the sandbox surfaces the syntax error instead.

/// Identifier the injected prelude declares. Its presence at a loop
/// body head marks the body as already guarded, which is what makes
/// sanitization idempotent.
pub const GUARD_MARKER: &str = "__golemStart";

fn guard(timeout_ms: u64) -> String {
    format!(
        "if (Date.now() - {GUARD_MARKER} > {timeout_ms}) throw new Error('Timeout after {timeout_ms} ms'); "
    )
}

fn prelude() -> String {
    format!("const {GUARD_MARKER} = Date.now();\n")
}

/// Inject loop-timeout guards into `source`.
///
/// Purely syntactic: non-loop code is untouched and the result is
/// semantically equivalent up to early timeout exceptions. Applying it
/// twice yields the same text as applying it once.
pub fn sanitize(source: &str, timeout_ms: u64) -> String {
    let Some(mask) = code_mask(source) else {
        return source.to_string();
    };

    let mut patches: Vec<(usize, String)> = Vec::new();
    let bytes = source.as_bytes();
    let guard_text = guard(timeout_ms);

    let mut i = 0;
    while i < bytes.len() {
        if !mask[i] || !source.is_char_boundary(i) {
            i += 1;
            continue;
        }
        let Some((keyword, kw_end)) = loop_keyword_at(source, &mask, i) else {
            i += 1;
            continue;
        };

        let body_start = match keyword {
            "do" => kw_end,
            _ => {
                // Step past the parenthesized loop head. An unbalanced
                // head means we cannot parse; leave the source alone.
                match matching_paren(source, &mask, kw_end) {
                    Some(close) => close + 1,
                    None => return source.to_string(),
                }
            }
        };

        let at_body = skip_ws(source, body_start);
        if source[at_body..].starts_with('{') {
            let inside = at_body + 1;
            if !already_guarded(source, inside) {
                patches.push((inside, format!(" {guard_text}")));
            }
            i = inside;
        } else if keyword == "do" {
            // `do stmt while (...)` without braces: too rare to chase.
            i = at_body;
        } else {
            // Single-statement body: wrap it in a block first.
            let Some(stmt_end) = statement_end(source, &mask, at_body) else {
                return source.to_string();
            };
            if !already_guarded(source, at_body) {
                patches.push((at_body, format!("{{ {guard_text}")));
                patches.push((stmt_end, " }".to_string()));
            }
            i = at_body;
        }
    }

    let mut out = source.to_string();
    // Reverse source order; at equal offsets the block closer goes in
    // first so a later opener lands to its left.
    patches.sort_by(|a, b| {
        b.0.cmp(&a.0).then_with(|| usize::from(a.1 != " }").cmp(&usize::from(b.1 != " }")))
    });
    for (pos, text) in patches {
        out.insert_str(pos, &text);
    }

    if !out.starts_with(&prelude()) {
        out.insert_str(0, &prelude());
    }
    out
}

/// True when the text at `pos` (after whitespace) is our injected guard.
fn already_guarded(source: &str, pos: usize) -> bool {
    source[skip_ws(source, pos)..].starts_with("if (Date.now() - ")
}

fn skip_ws(source: &str, mut pos: usize) -> usize {
    let bytes = source.as_bytes();
    while pos < bytes.len() && (bytes[pos] as char).is_ascii_whitespace() {
        pos += 1;
    }
    pos
}

/// Loop keyword starting exactly at `pos` (with identifier boundaries).
/// Returns the keyword and the offset just past it.
fn loop_keyword_at<'a>(source: &'a str, mask: &[bool], pos: usize) -> Option<(&'a str, usize)> {
    for keyword in ["while", "for", "do"] {
        if !source[pos..].starts_with(keyword) {
            continue;
        }
        let end = pos + keyword.len();
        let before = source[..pos].chars().next_back();
        let after = source[end..].chars().next();
        let bounded = before.map(|c| !is_ident(c)).unwrap_or(true)
            && after.map(|c| !is_ident(c)).unwrap_or(true);
        if !bounded || !mask[pos] {
            continue;
        }
        if keyword == "do" {
            // `do` must be followed by a block or statement, not `:`/ident.
            let next = source[skip_ws(source, end)..].chars().next();
            if next != Some('{') {
                continue;
            }
        } else {
            // `while`/`for` must introduce a head. This also skips the
            // trailing `while` of a do-while, whose head guards nothing.
            let head = skip_ws(source, end);
            if !source[head..].starts_with('(') {
                continue;
            }
            if keyword == "while" && is_do_while_tail(source, mask, pos) {
                continue;
            }
        }
        return Some((keyword, end));
    }
    None
}

/// Heuristic: a `while` preceded (ignoring whitespace) by `}` in code
/// position is the tail of a do-while.
fn is_do_while_tail(source: &str, mask: &[bool], pos: usize) -> bool {
    let mut i = pos;
    while i > 0 {
        i -= 1;
        let c = source.as_bytes()[i] as char;
        if c.is_ascii_whitespace() {
            continue;
        }
        return mask[i] && c == '}';
    }
    false
}

fn is_ident(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Find the `)` matching the `(` that opens at or after `pos`.
fn matching_paren(source: &str, mask: &[bool], pos: usize) -> Option<usize> {
    let open = skip_ws(source, pos);
    if !source[open..].starts_with('(') {
        return None;
    }
    let bytes = source.as_bytes();
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if !mask[i] {
            continue;
        }
        match b {
            b'(' => depth += 1,
            b')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// End offset (one past `;`) of the single statement starting at `pos`.
fn statement_end(source: &str, mask: &[bool], pos: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(pos) {
        if !mask[i] {
            continue;
        }
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => {
                if depth == 0 {
                    // Statement ends at the enclosing block's close.
                    return Some(i);
                }
                depth -= 1;
            }
            b';' if depth == 0 => return Some(i + 1),
            _ => {}
        }
    }
    Some(bytes.len())
}

/// Byte mask: `true` where the byte is code, `false` inside strings,
/// template literals or comments. `None` when the scanner loses track
/// (unterminated literal).
fn code_mask(source: &str) -> Option<Vec<bool>> {
    #[derive(PartialEq)]
    enum Mode {
        Code,
        Single,
        Double,
        Template,
        LineComment,
        BlockComment,
    }

    let bytes = source.as_bytes();
    let mut mask = vec![true; bytes.len()];
    let mut mode = Mode::Code;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match mode {
            Mode::Code => match b {
                b'\'' => {
                    mode = Mode::Single;
                    mask[i] = false;
                }
                b'"' => {
                    mode = Mode::Double;
                    mask[i] = false;
                }
                b'`' => {
                    mode = Mode::Template;
                    mask[i] = false;
                }
                b'/' if bytes.get(i + 1) == Some(&b'/') => {
                    mode = Mode::LineComment;
                    mask[i] = false;
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    mode = Mode::BlockComment;
                    mask[i] = false;
                }
                _ => {}
            },
            Mode::Single | Mode::Double | Mode::Template => {
                mask[i] = false;
                let close = match mode {
                    Mode::Single => b'\'',
                    Mode::Double => b'"',
                    _ => b'`',
                };
                if b == b'\\' {
                    if let Some(slot) = mask.get_mut(i + 1) {
                        *slot = false;
                    }
                    i += 1;
                } else if b == close {
                    mode = Mode::Code;
                } else if b == b'\n' && mode != Mode::Template {
                    // Unterminated ordinary string.
                    return None;
                }
            }
            Mode::LineComment => {
                if b == b'\n' {
                    mode = Mode::Code;
                } else {
                    mask[i] = false;
                }
            }
            Mode::BlockComment => {
                mask[i] = false;
                if b == b'*' && bytes.get(i + 1) == Some(&b'/') {
                    if let Some(slot) = mask.get_mut(i + 1) {
                        *slot = false;
                    }
                    i += 1;
                    mode = Mode::Code;
                }
            }
        }
        i += 1;
    }

    match mode {
        Mode::Code | Mode::LineComment => Some(mask),
        _ => None,
    }
}

#[cfg(test)]
#[path = "sanitize_tests.rs"]
mod tests;
