//! Result rendering.
//!
//! Turns typed rows into a [`ResultTable`] of normalized text and renders
//! tables as markdown. Nothing here talks to a backend.

use common::models::{ResultTable, SqlValue};

use crate::drivers::RowSet;

/// Cells longer than this many characters are shortened.
pub const MAX_CELL_CHARS: usize = 50;

const ELLIPSIS: &str = "...";

/// Canonical text for one cell.
pub fn normalize_cell(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Bool(v) => v.to_string(),
        SqlValue::Int(v) => v.to_string(),
        SqlValue::UInt(v) => v.to_string(),
        SqlValue::Float(v) => v.to_string(),
        SqlValue::Text(v) => v.clone(),
        SqlValue::Bytes(v) => String::from_utf8_lossy(v).into_owned(),
    }
}

/// Normalizes every cell of a fetched row set.
pub fn to_result_table(set: RowSet) -> ResultTable {
    let rows: Vec<Vec<String>> = set
        .rows
        .iter()
        .map(|row| row.iter().map(normalize_cell).collect())
        .collect();
    ResultTable {
        columns: set.columns,
        row_count: rows.len(),
        rows,
        truncated: set.truncated,
    }
}

/// Renders `table` as a markdown table: header, separator, then rows in order.
pub fn render_table(table: &ResultTable) -> String {
    let mut out = String::new();
    push_row(&mut out, table.columns.iter().map(String::as_str));
    push_row(&mut out, table.columns.iter().map(|_| "---"));
    for row in &table.rows {
        push_row(&mut out, row.iter().map(String::as_str));
    }
    out
}

fn push_row<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>) {
    out.push('|');
    for cell in cells {
        out.push(' ');
        out.push_str(&format_cell(cell));
        out.push_str(" |");
    }
    out.push('\n');
}

/// Escapes, flattens and shortens one cell for display.
pub fn format_cell(cell: &str) -> String {
    truncate(&escape(cell))
}

// Line breaks would end the markdown row early.
fn escape(cell: &str) -> String {
    let mut out = String::with_capacity(cell.len());
    for c in cell.chars() {
        match c {
            '|' => out.push_str("\\|"),
            '\r' => {}
            '\n' => out.push(' '),
            c => out.push(c),
        }
    }
    out
}

fn truncate(cell: &str) -> String {
    if cell.chars().count() <= MAX_CELL_CHARS {
        return cell.to_string();
    }
    let keep = MAX_CELL_CHARS - ELLIPSIS.len();
    let mut out: String = cell.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}
