//! Output formatting for CLI display.

use crate::stats::{Cell, Column, StatsTable};

/// Format one statistics cell for a text table.
pub(super) fn format_cell(cell: &Cell) -> String {
    match cell {
        Cell::Counter { total } => total.to_string(),
        Cell::Timer {
            total_seconds,
            average_seconds: Some(avg),
        } => format!("{total_seconds}s (avg {avg:.1}s)"),
        Cell::Timer {
            total_seconds,
            average_seconds: None,
        } => format!("{total_seconds}s"),
        Cell::Categorical { options, total } => {
            let shares: Vec<String> = options
                .iter()
                .map(|o| format!("{} {}% ({})", o.label, o.percent, o.count))
                .collect();
            format!("{}; total {total}", shares.join(", "))
        }
        Cell::NoData => "-".to_string(),
    }
}

fn format_header(column: &Column) -> String {
    format!(
        "{} / {} / {}",
        column.sheet_title, column.criterion_label, column.observable_label
    )
}

/// Render the whole table as aligned text, one student per line.
pub(super) fn format_stats_table(table: &StatsTable) -> String {
    if table.columns.is_empty() {
        return "No observables for this sport\n".to_string();
    }
    if table.rows.is_empty() {
        return "No students\n".to_string();
    }

    let mut grid: Vec<Vec<String>> = Vec::with_capacity(table.rows.len() + 1);
    grid.push(
        std::iter::once("Élève".to_string())
            .chain(table.columns.iter().map(format_header))
            .collect(),
    );
    for row in &table.rows {
        grid.push(
            std::iter::once(row.student.full_name())
                .chain(row.cells.iter().map(format_cell))
                .collect(),
        );
    }

    let widths: Vec<usize> = (0..grid[0].len())
        .map(|i| {
            grid.iter()
                .map(|r| r[i].chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    for row in &grid {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(text, &w)| {
                let pad = w - text.chars().count();
                format!("{text}{}", " ".repeat(pad))
            })
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }
    out
}
