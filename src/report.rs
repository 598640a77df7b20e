//! Tabular views of change records, unmatched rows and summaries for the
//! command-line front end. Row numbers are 1-based data rows.

use itertools::Itertools;

use crate::{
    batch::RowSelection,
    dataset::Dataset,
    diff::ChangeRecord,
    matcher::{MatchOutcome, MatchResult},
    summary::MergeSummary,
};

pub const CHANGE_HEADERS: &[&str] = &[
    "row",
    "key",
    "column",
    "old_value",
    "new_value",
    "classification",
    "source",
    "source_row",
    "rule",
    "write_mode",
];

pub const UNMATCHED_HEADERS: &[&str] = &["row", "key"];

pub fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

/// Display form of the key columns of one target row.
pub fn row_key(target: &Dataset, key_columns: &[String], row: usize) -> String {
    key_columns
        .iter()
        .map(|column| target.value(row, column).as_display())
        .join(" | ")
}

pub fn change_rows<'a>(
    target: &Dataset,
    key_columns: &[String],
    records: impl IntoIterator<Item = &'a ChangeRecord>,
) -> Vec<Vec<String>> {
    records
        .into_iter()
        .map(|record| {
            let new_value = if record.is_mutating() {
                record.new_value.as_display()
            } else {
                record.proposed.as_display()
            };
            let rule = match record.superseded_by {
                Some(winner) => format!("{} (superseded by {})", record.rule.index + 1, winner + 1),
                None => (record.rule.index + 1).to_string(),
            };
            vec![
                (record.row + 1).to_string(),
                row_key(target, key_columns, record.row),
                record.column.clone(),
                record.old_value.as_display(),
                new_value,
                record.classification.as_str().to_string(),
                record.source.clone(),
                (record.source_row + 1).to_string(),
                rule,
                record.rule.write_mode.to_string(),
            ]
        })
        .collect()
}

/// Target rows not matched by any source, ambiguous ones excluded.
pub fn unmatched_rows(
    target: &Dataset,
    key_columns: &[String],
    matches: &[MatchResult],
    selection: &RowSelection,
) -> Vec<Vec<String>> {
    selection
        .rows()
        .filter(|row| {
            matches.iter().all(|result| {
                matches!(result.outcome(*row), Some(MatchOutcome::Unmatched) | None)
            })
        })
        .map(|row| vec![(row + 1).to_string(), row_key(target, key_columns, row)])
        .collect()
}

pub fn summary_lines(summary: &MergeSummary) -> Vec<String> {
    let mut lines = vec![
        format!("Rows processed:   {}", summary.total_rows),
        format!(
            "Rows matched:     {} ({:.1}%)",
            summary.rows_matched, summary.match_percent
        ),
        format!("Rows unmatched:   {}", summary.rows_unmatched),
        format!("Rows ambiguous:   {}", summary.rows_ambiguous),
        format!("Rows changed:     {}", summary.rows_with_changes),
        format!(
            "Cells filled: {}, overwritten: {}, conflicts: {}, unchanged: {}",
            summary.cells_filled,
            summary.cells_overwritten,
            summary.cells_conflict,
            summary.cells_unchanged
        ),
    ];
    for source in &summary.sources {
        lines.push(format!(
            "Source '{}': {} matched, {} unmatched, {} ambiguous, {} source row(s) unused",
            source.source, source.matched, source.unmatched, source.ambiguous, source.unused_source_rows
        ));
    }
    for rule in &summary.rules {
        lines.push(format!(
            "Rule {} {} -> {} ({}): {} filled, {} overwritten, {} conflict(s)",
            rule.index + 1,
            rule.source_column,
            rule.target_column,
            rule.write_mode,
            rule.filled,
            rule.overwritten,
            rule.conflicts
        ));
    }
    lines
}
