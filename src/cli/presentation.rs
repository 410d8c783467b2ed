//! CLI presentation: text and json formatters per command family.

mod report;
mod shared;
mod status;
mod validation;

pub use report::{format_batch_report_text, format_seed_summary};
pub use shared::{format_section_heading, to_json};
pub use status::format_progress_state_text;
pub use validation::format_validation_text;
