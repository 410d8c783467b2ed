//! Saved progress state.

use super::shared::format_section_heading;
use crate::orchestrator::ProgressState;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;

pub fn format_progress_state_text(state: Option<&ProgressState>) -> String {
    let state = match state {
        Some(state) => state,
        None => return "No run in progress.".to_string(),
    };
    let mut out = String::new();
    out.push_str(&format!("{}\n", format_section_heading("Run Progress")));
    out.push_str(&format!("  Run id: {}\n", state.run_id));
    out.push_str(&format!("  Started: {}\n", state.started_at.to_rfc3339()));
    out.push_str(&format!("  Updated: {}\n", state.updated_at.to_rfc3339()));
    let c = &state.counters;
    out.push_str(&format!(
        "  Groups: {} completed, {} failed, {} skipped\n",
        c.groups_completed, c.groups_failed, c.groups_skipped
    ));
    out.push_str(&format!(
        "  Artifacts: {} generated, {} failed; writes: {} succeeded, {} failed\n\n",
        c.artifacts_generated, c.artifacts_failed, c.writes_succeeded, c.writes_failed
    ));

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Group", "Status", "Generation", "Import", "Validation", "Last error"]);
    for group in &state.groups {
        table.add_row(vec![
            group.slug.clone(),
            group.status.to_string(),
            format!("{} ({})", group.generation.status, group.generation.attempts),
            format!("{} ({})", group.import.status, group.import.attempts),
            format!("{} ({})", group.validation.status, group.validation.attempts),
            group.last_error.clone().unwrap_or_default(),
        ]);
    }
    out.push_str(&format!("{}", table));
    out
}
