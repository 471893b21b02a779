use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};
use rabit_cijobs::status::{HistoryEntry, JobStatus};
use serde_json::Value;

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn color_coded_status_cell(status: Option<&JobStatus>) -> Cell {
    match status {
        Some(status) if status.is_running() => Cell::new(status).fg(TableColor::Yellow),
        Some(status) if status.is_ok() => Cell::new(status).fg(TableColor::Green),
        Some(status) => Cell::new(status).fg(TableColor::Red),
        None => Cell::new("-").fg(TableColor::DarkGrey),
    }
}

fn create_cyan_header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

fn build_number_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "-".to_string(),
        Some(other) => other.to_string(),
    }
}

/// Renders `cijobs.history` builds as a table of job, build and status.
pub fn render_history(entries: &[HistoryEntry]) -> String {
    let mut table = create_table();
    table.set_header(create_cyan_header(&["CI Job", "Build", "Status"]));

    for entry in entries {
        table.add_row(vec![
            Cell::new(entry.org_project_name.as_deref().unwrap_or("-")),
            Cell::new(build_number_text(entry.build_number.as_ref())),
            color_coded_status_cell(entry.overall_status.as_ref()),
        ]);
    }

    table.to_string()
}
