//! Plain-text aligned tables for terminal previews.

use std::fmt::Write as _;

/// Cells wider than this are cut and end with `…`.
pub const MAX_CELL_WIDTH: usize = 40;

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let cells = |row: &[String]| -> Vec<String> {
        (0..headers.len())
            .map(|idx| fit_cell(row.get(idx).map(String::as_str).unwrap_or_default()))
            .collect()
    };
    let header_cells = cells(headers);
    let body = rows.iter().map(|row| cells(row.as_slice())).collect::<Vec<_>>();

    let mut widths = header_cells
        .iter()
        .map(|h| h.chars().count().max(3))
        .collect::<Vec<_>>();
    for row in &body {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(&header_cells, &widths));
    let rule = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&rule, &widths));
    for row in &body {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn format_row(cells: &[String], widths: &[usize]) -> String {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

/// Flattens control whitespace and shortens long values.
fn fit_cell(value: &str) -> String {
    let flat = value
        .chars()
        .map(|ch| if matches!(ch, '\n' | '\r' | '\t') { ' ' } else { ch })
        .collect::<String>();
    if flat.chars().count() <= MAX_CELL_WIDTH {
        return flat;
    }
    let mut cut = flat.chars().take(MAX_CELL_WIDTH - 1).collect::<String>();
    cut.push('…');
    cut
}
