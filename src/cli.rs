//! CLI domain: parse, route, output, and presentation only.
//! No pipeline logic; a single route table dispatches to the library services.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands};
pub use presentation::{
    format_batch_report_text, format_progress_state_text, format_section_heading,
    format_seed_summary, format_validation_text, to_json,
};
pub use route::{CommandOutcome, RunContext};
