//! Batch run report and seed summary.

use super::shared::{format_section_heading, format_verdict};
use crate::catalog::SeedSummary;
use crate::content::ArtifactKind;
use crate::orchestrator::BatchReport;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;

pub fn format_batch_report_text(report: &BatchReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", format_section_heading("Batch Run")));
    out.push_str(&format!("  Run id: {}\n\n", report.run_id));

    let mut groups = Table::new();
    groups.load_preset(UTF8_BORDERS_ONLY);
    groups.set_header(vec![
        "Group",
        "Status",
        "Generation",
        "Import",
        "Validation",
        "Units",
        "Issues",
        "Note",
    ]);
    for outcome in &report.groups {
        groups.add_row(vec![
            outcome.group.clone(),
            outcome.status.to_string(),
            outcome.steps.generation.to_string(),
            outcome.steps.import.to_string(),
            outcome.steps.validation.to_string(),
            outcome.units.to_string(),
            outcome.issues.to_string(),
            outcome.message.clone().unwrap_or_default(),
        ]);
    }
    out.push_str(&format!("{}\n\n", groups));

    let generated = report.generation.total();
    let written = report.writes.total();
    if generated.attempted > 0 || written.attempted > 0 {
        out.push_str(&format!("{}\n", format_section_heading("Artifacts")));
        let mut kinds = Table::new();
        kinds.load_preset(UTF8_BORDERS_ONLY);
        kinds.set_header(vec!["Kind", "Generated", "Generation failed", "Written", "Write failed"]);
        for kind in ArtifactKind::ALL {
            let g = report.generation.get(kind);
            let w = report.writes.get(kind);
            kinds.add_row(vec![
                kind.to_string(),
                g.succeeded.to_string(),
                g.failed.to_string(),
                w.succeeded.to_string(),
                w.failed.to_string(),
            ]);
        }
        out.push_str(&format!("{}\n\n", kinds));
    }

    if !report.failures.is_empty() {
        out.push_str(&format!(
            "{}\n",
            format_section_heading(&format!("Failures ({})", report.failures.len()))
        ));
        for failure in &report.failures {
            let subject = match &failure.unit {
                Some(unit) => format!("{}/{}", failure.group, unit),
                None => failure.group.clone(),
            };
            let kind = failure
                .kind
                .map(|k| format!(" {}", k))
                .unwrap_or_default();
            out.push_str(&format!(
                "  - {}{} [{}]: {}\n",
                subject, kind, failure.stage, failure.message
            ));
        }
        out.push('\n');
    }

    for path in &report.exports {
        out.push_str(&format!("Exported: {}\n", path.display()));
    }
    if let Some(path) = &report.archived {
        out.push_str(&format!("Progress archived: {}\n", path.display()));
    }

    out.push_str(&format_verdict(
        !report.has_unresolved_failures(),
        "All requested groups completed or skipped.",
        "Unresolved failures remain.",
    ));
    out
}

pub fn format_seed_summary(summary: &SeedSummary) -> String {
    format!(
        "Seeded {} groups and {} units.",
        summary.groups, summary.units
    )
}
