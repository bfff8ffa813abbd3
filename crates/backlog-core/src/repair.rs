//! Best-effort recovery of JSON from model output.
//!
//! Model responses are *expected* to be JSON but arrive wrapped in code
//! fences or with small punctuation slips. [`repair`] applies a fixed,
//! ordered list of transforms. The transforms compose: each stage rewrites
//! the output of the previous one, and the accumulated text is parsed after
//! every stage. The first successful parse wins, so text that is already
//! valid JSON is returned after the (no-op) fence stage untouched.
//!
//! Stages 2–5 scan the text with a small string-literal tracker, so nothing
//! inside a JSON string is ever rewritten.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("could not parse JSON after {stages} repair stages: {source}")]
pub struct RepairError {
    pub stages: usize,
    #[source]
    pub source: serde_json::Error,
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

type Stage = fn(&str) -> String;

const STAGES: [(&str, Stage); 5] = [
    ("strip code fences", strip_code_fences),
    ("comma between strings across lines", comma_between_lines),
    ("comma between strings on one line", comma_between_inline),
    ("drop trailing commas", drop_trailing_commas),
    ("comma before nested value", comma_before_nested),
];

static OPEN_FENCE_RE: OnceLock<Regex> = OnceLock::new();
static CLOSE_FENCE_RE: OnceLock<Regex> = OnceLock::new();

fn open_fence_re() -> &'static Regex {
    OPEN_FENCE_RE.get_or_init(|| Regex::new(r"(?mi)^[ \t]*(?:```|~~~)[a-z0-9_+-]*[ \t]*\r?\n?").unwrap())
}

fn close_fence_re() -> &'static Regex {
    CLOSE_FENCE_RE.get_or_init(|| Regex::new(r"(?m)[ \t]*(?:```|~~~)[ \t]*\r?$").unwrap())
}

/// Stage 1: remove fence delimiters (```` ``` ```` or `~~~`, optional language
/// tag, any case) at line start or line end, then trim.
pub fn strip_code_fences(text: &str) -> String {
    let opened = open_fence_re().replace_all(text, "");
    let closed = close_fence_re().replace_all(&opened, "");
    closed.trim().to_string()
}

/// Stage 2: `"a"\n"b"` → `"a",\n"b"`.
fn comma_between_lines(text: &str) -> String {
    insert_after_strings(text, |gap, next| next == '"' && gap.contains('\n'))
}

/// Stage 3: `"a" "b"` → `"a","b"` (also `"a""b"`).
fn comma_between_inline(text: &str) -> String {
    insert_after_strings(text, |gap, next| next == '"' && !gap.contains('\n'))
}

/// Stage 4: `[1, 2,]` → `[1, 2]`, `{"a": 1,}` → `{"a": 1}`.
fn drop_trailing_commas(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut scan = StringTracker::default();
    for (i, c) in text.char_indices() {
        if !scan.in_string() && c == ',' {
            let rest = text[i + 1..].trim_start();
            if rest.starts_with(']') || rest.starts_with('}') {
                continue;
            }
        }
        scan.feed(c);
        out.push(c);
    }
    out
}

/// Stage 5: `"a" {` → `"a", {` and `"a" [` → `"a", [`.
fn comma_before_nested(text: &str) -> String {
    insert_after_strings(text, |_, next| next == '{' || next == '[')
}

// ---------------------------------------------------------------------------
// String-literal tracking
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StringTracker {
    in_string: bool,
    escaped: bool,
}

impl StringTracker {
    fn in_string(&self) -> bool {
        self.in_string
    }

    /// Feed one character; returns `true` when it closed a string literal.
    fn feed(&mut self, c: char) -> bool {
        if !self.in_string {
            if c == '"' {
                self.in_string = true;
            }
            return false;
        }
        if self.escaped {
            self.escaped = false;
        } else if c == '\\' {
            self.escaped = true;
        } else if c == '"' {
            self.in_string = false;
            return true;
        }
        false
    }
}

/// Insert a comma directly after every closing quote whose following
/// whitespace run (`gap`) and next non-whitespace character satisfy `wants`.
fn insert_after_strings(text: &str, wants: impl Fn(&str, char) -> bool) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut scan = StringTracker::default();
    for (i, c) in text.char_indices() {
        out.push(c);
        if scan.feed(c) {
            let rest = &text[i + c.len_utf8()..];
            let trimmed = rest.trim_start();
            let gap = &rest[..rest.len() - trimmed.len()];
            if let Some(next) = trimmed.chars().next() {
                if wants(gap, next) {
                    out.push(',');
                }
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse `text` as JSON, repairing it stage by stage if needed.
pub fn repair(text: &str) -> Result<Value, RepairError> {
    let (_, first) = STAGES[0];
    let mut current = first(text);
    let mut last_err = match serde_json::from_str::<Value>(&current) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };
    for (i, (label, stage)) in STAGES.iter().enumerate().skip(1) {
        current = stage(&current);
        match serde_json::from_str::<Value>(&current) {
            Ok(value) => {
                tracing::debug!(stage = i + 1, label, "repaired model JSON");
                return Ok(value);
            }
            Err(e) => {
                tracing::trace!(stage = i + 1, label, error = %e, "repair stage did not parse");
                last_err = e;
            }
        }
    }
    Err(RepairError {
        stages: STAGES.len(),
        source: last_err,
    })
}

/// Repair `text` and re-serialise it compactly. Applying this to its own
/// output returns the same bytes.
pub fn canonicalize(text: &str) -> Result<String, RepairError> {
    let value = repair(text)?;
    Ok(value.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
