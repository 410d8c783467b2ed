//! Validation results.

use super::shared::{format_section_heading, format_verdict};
use crate::validator::GroupValidation;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;

pub fn format_validation_text(reports: &[GroupValidation]) -> String {
    let mut out = String::new();
    if reports.is_empty() {
        return "No groups to validate.".to_string();
    }
    for report in reports {
        let verdict = if report.is_valid() {
            "valid".to_string()
        } else {
            format!("{} issues", report.issue_count())
        };
        out.push_str(&format!(
            "{}\n",
            format_section_heading(&format!("Group {}: {}", report.group, verdict))
        ));
        for issue in &report.issues {
            out.push_str(&format!("  - {}\n", issue));
        }
        if !report.units.is_empty() {
            let mut table = Table::new();
            table.load_preset(UTF8_BORDERS_ONLY);
            table.set_header(vec!["Unit", "Kind", "Count", "Target", "Issues"]);
            for unit in &report.units {
                for kind in &unit.kinds {
                    table.add_row(vec![
                        unit.unit.unit.clone(),
                        kind.kind.to_string(),
                        kind.count.to_string(),
                        kind.target.to_string(),
                        kind.issues.len().to_string(),
                    ]);
                }
            }
            out.push_str(&format!("{}\n", table));
        }
        for unit in report.units.iter().filter(|u| !u.is_valid()) {
            for issue in unit.issues() {
                out.push_str(&format!("  - {}: {}\n", unit.unit, issue));
            }
        }
        out.push('\n');
    }
    let valid = reports.iter().all(GroupValidation::is_valid);
    out.push_str(&format_verdict(valid, "All content valid.", "Validation failed."));
    out
}
