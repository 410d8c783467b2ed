//! Shared presentation helpers.

use crate::error::{PipelineError, StorageError};
use owo_colors::OwoColorize;
use serde::Serialize;

/// Section heading in bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

pub fn to_json<T: Serialize>(value: &T) -> Result<String, PipelineError> {
    serde_json::to_string_pretty(value).map_err(|e| StorageError::Serialization(e).into())
}

/// Trailing summary line: green when clean, red otherwise.
pub fn format_verdict(ok: bool, ok_text: &str, failed_text: &str) -> String {
    if ok {
        format!("{}", ok_text.green())
    } else {
        format!("{}", failed_text.red().bold())
    }
}
