use std::collections::BTreeSet;

use itertools::Itertools;
use serde::Serialize;

use crate::{
    batch::RowSelection,
    diff::{Classification, ChangeRecord, Diff},
    matcher::{MatchOutcome, MatchResult},
    profile::WriteMode,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleSummary {
    pub index: usize,
    pub source_column: String,
    pub target_column: String,
    pub write_mode: WriteMode,
    pub filled: usize,
    pub overwritten: usize,
    pub conflicts: usize,
    pub unchanged: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSummary {
    pub source: String,
    pub matched: usize,
    pub unmatched: usize,
    pub ambiguous: usize,
    pub unused_source_rows: usize,
}

/// Counts describing one preview. Formatting is left to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeSummary {
    pub total_rows: usize,
    /// Target rows matched by at least one source.
    pub rows_matched: usize,
    pub rows_with_changes: usize,
    /// Target rows neither matched nor ambiguous against any source.
    pub rows_unmatched: usize,
    pub rows_ambiguous: usize,
    pub cells_filled: usize,
    pub cells_overwritten: usize,
    pub cells_conflict: usize,
    pub cells_unchanged: usize,
    pub match_percent: f64,
    pub rules: Vec<RuleSummary>,
    pub sources: Vec<SourceSummary>,
}

impl MergeSummary {
    pub fn new(total_rows: usize, matches: &[MatchResult], diff: &Diff) -> Self {
        Self::for_selection(&RowSelection::all(total_rows), matches, diff)
    }

    /// Counts only the target rows inside `selection`.
    pub fn for_selection(selection: &RowSelection, matches: &[MatchResult], diff: &Diff) -> Self {
        let total_rows = selection.count();
        let mut matched = BTreeSet::new();
        let mut ambiguous = BTreeSet::new();
        for result in matches {
            for row in result.rows.iter().filter(|row| selection.contains(row.target_row)) {
                match row.outcome {
                    MatchOutcome::Matched { .. } => {
                        matched.insert(row.target_row);
                    }
                    MatchOutcome::Ambiguous { .. } => {
                        ambiguous.insert(row.target_row);
                    }
                    MatchOutcome::Unmatched => {}
                }
            }
        }
        let rows_ambiguous = ambiguous.difference(&matched).count();
        let rows_unmatched = total_rows.saturating_sub(matched.len() + rows_ambiguous);

        let counts = diff.counts();
        let rows_with_changes = diff.mutating().map(|r| r.row).unique().count();
        let match_percent = if total_rows == 0 {
            0.0
        } else {
            matched.len() as f64 / total_rows as f64 * 100.0
        };

        MergeSummary {
            total_rows,
            rows_matched: matched.len(),
            rows_with_changes,
            rows_unmatched,
            rows_ambiguous,
            cells_filled: counts.filled,
            cells_overwritten: counts.overwritten,
            cells_conflict: counts.conflict_skipped,
            cells_unchanged: counts.unchanged,
            match_percent,
            rules: rule_summaries(&diff.records),
            sources: matches
                .iter()
                .map(|result| source_summary(result, selection))
                .collect(),
        }
    }

    pub fn cells_modified(&self) -> usize {
        self.cells_filled + self.cells_overwritten
    }
}

fn rule_summaries(records: &[ChangeRecord]) -> Vec<RuleSummary> {
    records
        .iter()
        .into_group_map_by(|record| (record.rule.index, record.column.clone()))
        .into_iter()
        .sorted_by(|(a, _), (b, _)| a.cmp(b))
        .map(|((index, target_column), group)| {
            let counts = group.iter().counts_by(|record| record.classification);
            let count = |class: Classification| counts.get(&class).copied().unwrap_or(0);
            RuleSummary {
                index,
                source_column: group[0].rule.source_column.clone(),
                target_column,
                write_mode: group[0].rule.write_mode,
                filled: count(Classification::Filled),
                overwritten: count(Classification::Overwritten),
                conflicts: count(Classification::ConflictSkipped),
                unchanged: count(Classification::Unchanged),
            }
        })
        .collect()
}

fn source_summary(result: &MatchResult, selection: &RowSelection) -> SourceSummary {
    let count = |predicate: fn(&MatchOutcome) -> bool| {
        result
            .rows
            .iter()
            .filter(|row| selection.contains(row.target_row) && predicate(&row.outcome))
            .count()
    };
    SourceSummary {
        source: result.source.clone(),
        matched: count(|o| matches!(o, MatchOutcome::Matched { .. })),
        unmatched: count(|o| matches!(o, MatchOutcome::Unmatched)),
        ambiguous: count(|o| matches!(o, MatchOutcome::Ambiguous { .. })),
        unused_source_rows: result.unmatched_source_rows.len(),
    }
}
