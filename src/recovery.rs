//! Structured-Output Recovery
//!
//! Turns free-form model output into a JSON value. Three strategies run in order and the
//! first that yields an object or array wins:
//!
//! 1. **Direct**: the trimmed text parses as-is.
//! 2. **Isolated**: the first fenced code block, or else the first bracketed span found by
//!    string-aware depth counting.
//! 3. **Repaired**: the isolated candidate after stripping control characters,
//!    collapsing whitespace, dropping trailing commas and invalid escapes.
//!
//! Every strategy is a pure function of the input text.

use crate::error::RecoveryError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::debug;

const PREVIEW_CHARS: usize = 200;
const FENCE: &str = "```";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStrategy {
    Direct,
    Isolated,
    Repaired,
}

impl fmt::Display for RecoveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryStrategy::Direct => write!(f, "direct"),
            RecoveryStrategy::Isolated => write!(f, "isolated"),
            RecoveryStrategy::Repaired => write!(f, "repaired"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recovered {
    pub value: Value,
    pub strategy: RecoveryStrategy,
}

/// Recover a structured value from `raw`.
pub fn recover_json(raw: &str) -> Result<Recovered, RecoveryError> {
    let recovered = direct(raw)
        .map(|value| (value, RecoveryStrategy::Direct))
        .or_else(|| isolated(raw).map(|value| (value, RecoveryStrategy::Isolated)))
        .or_else(|| repaired(raw).map(|value| (value, RecoveryStrategy::Repaired)));

    match recovered {
        Some((value, strategy)) => {
            debug!(strategy = %strategy, input_len = raw.len(), "recovered structured output");
            Ok(Recovered { value, strategy })
        }
        None => Err(RecoveryError::MalformedOutput {
            preview: raw.chars().take(PREVIEW_CHARS).collect(),
        }),
    }
}

/// Recover and deserialize into `T`.
pub fn recover_as<T: DeserializeOwned>(raw: &str) -> Result<(T, RecoveryStrategy), RecoveryError> {
    let Recovered { value, strategy } = recover_json(raw)?;
    let typed = serde_json::from_value(value).map_err(|e| RecoveryError::Mismatch(e.to_string()))?;
    Ok((typed, strategy))
}

fn parse_structured(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => Some(value),
        _ => None,
    }
}

fn direct(raw: &str) -> Option<Value> {
    parse_structured(raw)
}

fn isolated(raw: &str) -> Option<Value> {
    fenced_block(raw)
        .and_then(parse_structured)
        .or_else(|| bracket_span(raw).and_then(parse_structured))
}

fn repaired(raw: &str) -> Option<Value> {
    let candidate = fenced_block(raw)
        .or_else(|| bracket_span(raw))
        .unwrap_or(raw);
    let fixed = repair(candidate);
    parse_structured(&fixed).or_else(|| bracket_span(&fixed).and_then(parse_structured))
}

/// Contents of the first closed fenced block, without its language tag.
fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find(FENCE)?;
    let after_fence = &text[open + FENCE.len()..];
    let tag_len = after_fence
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(after_fence.len());
    let body = &after_fence[tag_len..];
    let close = body.find(FENCE)?;
    Some(body[..close].trim())
}

/// Span from the first `{` or `[` to its matching close, ignoring brackets inside strings.
fn bracket_span(text: &str) -> Option<&str> {
    let start = text.find(|c| c == '{' || c == '[')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[start..start + offset + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

fn repair(text: &str) -> String {
    let stripped: String = text
        .chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .collect();
    let collapsed = collapse_whitespace(&stripped);
    let escaped = drop_invalid_escapes(&collapsed);
    remove_trailing_commas(&escaped)
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for c in text.trim().chars() {
        if c.is_whitespace() {
            if !in_run {
                out.push(' ');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

fn drop_invalid_escapes(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if !in_string {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
            i += 1;
            continue;
        }
        match c {
            '\\' => match chars.get(i + 1) {
                Some('"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't') => {
                    out.push('\\');
                    out.push(chars[i + 1]);
                    i += 2;
                }
                Some('u') if is_unicode_escape(&chars[i + 1..]) => {
                    out.push('\\');
                    i += 1;
                }
                // Invalid escape: drop the backslash, keep what follows.
                _ => i += 1,
            },
            '"' => {
                in_string = false;
                out.push(c);
                i += 1;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

/// `rest` starts at the `u` of a `\u` escape.
fn is_unicode_escape(rest: &[char]) -> bool {
    rest.len() >= 5 && rest[1..5].iter().all(|c| c.is_ascii_hexdigit())
}

fn remove_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            out.push(c);
            continue;
        }
        if c == '"' {
            in_string = true;
        } else if c == ',' {
            let next = chars[i + 1..].iter().find(|n| !n.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}
