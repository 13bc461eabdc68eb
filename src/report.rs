use chrono::Utc;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::executor::ImportResult;
use crate::plan::ImportPlan;

/// Persist an import result as pretty JSON and return the file path
pub fn persist_result(result: &ImportResult, output_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)?;

    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let filename = format!("import_{}_{timestamp}.json", sanitize(&result.event_id));
    let filepath = output_dir.join(filename);

    let json_content = serde_json::to_string_pretty(result)?;
    fs::write(&filepath, json_content)?;
    Ok(filepath)
}

fn sanitize(event_id: &str) -> String {
    event_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Operator-facing plan summary with one line per row
pub fn render_plan(plan: &ImportPlan) -> String {
    let c = &plan.counts;
    let mut out = String::new();
    let _ = writeln!(out, "Plan for event {} from {}", plan.event_id, plan.source_name);
    let _ = writeln!(out, "   Rows considered: {}", c.total);
    let _ = writeln!(out, "   To update: {} ({} booth changes)", c.to_update, c.booth_changes);
    let _ = writeln!(out, "   To insert: {}", c.to_insert);
    let _ = writeln!(out, "   Skipped: {}", c.skipped);
    if c.dropped_rows > 0 {
        let _ = writeln!(out, "   Rows without organization (ignored): {}", c.dropped_rows);
    }
    let _ = writeln!(out);

    for entry in &plan.entries {
        let row = entry.candidate.source_row;
        let name = &entry.candidate.organization_name;
        match (entry.action(), entry.classification.skip_reason()) {
            (_, Some(reason)) => {
                let _ = writeln!(out, "   [{row:>4}] SKIP    {name} ({reason})");
            }
            (Some(action), None) => {
                let booth = match &entry.booth_diff {
                    Some(diff) if diff.changed => format!("booth {} -> {}", diff.existing, diff.incoming),
                    _ => format!("booth {}", entry.candidate.booth),
                };
                let _ = write!(out, "   [{row:>4}] {action:<7} {name} ({booth})");
                if let Some(first) = entry.duplicate_of {
                    let _ = write!(out, " [repeats row {first}]");
                }
                let _ = writeln!(out);
            }
            (None, None) => {}
        }
    }
    out
}

/// Operator-facing result summary including every failed row
pub fn render_result(result: &ImportResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Import results for event {}:", result.event_id);
    let _ = writeln!(out, "   Updated: {}", result.updated);
    let _ = writeln!(out, "   Inserted: {}", result.inserted);
    let _ = writeln!(out, "   Skipped: {}", result.skipped);
    let _ = writeln!(out, "   Failed: {}", result.failed());
    if result.cancelled {
        let _ = writeln!(out, "   Not attempted (cancelled): {}", result.not_attempted);
    }
    if !result.errors.is_empty() {
        let _ = writeln!(out, "\nErrors encountered:");
        for error in &result.errors {
            let _ = writeln!(
                out,
                "   - {} (row {}): {}",
                error.organization_name, error.source_row, error.message
            );
        }
    }
    out
}
