//! Placeholder and thin-text detection.

use regex::Regex;
use std::sync::LazyLock;

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:todo|tbd|fixme|xxx|placeholder)\b|lorem\s+ipsum|coming\s+soon|\[insert[^\]]*\]|content\s+goes\s+here|to\s+be\s+added",
    )
    .expect("placeholder pattern is valid")
});

/// Text classes with different minimums.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    /// Prose: notes body, prompts, questions, explanations, model answers.
    Descriptive,
    /// Answers, options, hints, key points and mark-scheme points.
    Short,
}

/// First placeholder marker in `text`, if any.
pub fn find_placeholder(text: &str) -> Option<&str> {
    PLACEHOLDER_RE.find(text).map(|m| m.as_str())
}

/// Describe what is wrong with `text`, or `None` when it is acceptable.
pub fn text_problem(text: &str, field: TextField, min_chars: usize) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some("empty".to_string());
    }
    if let Some(marker) = find_placeholder(trimmed) {
        return Some(format!("placeholder text {:?}", marker));
    }
    let chars = trimmed.chars().count();
    if field == TextField::Descriptive && chars < min_chars {
        return Some(format!("too short ({}/{} chars)", chars, min_chars));
    }
    None
}
