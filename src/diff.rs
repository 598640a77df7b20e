//! Classification of candidate writes against the current target.
//!
//! Each candidate is compared with the value the target holds *now*, never
//! with an earlier candidate for the same cell. When several candidates
//! mutate one cell, the last one in rule order is retained and the earlier
//! ones are downgraded to [`Classification::Unchanged`] with `superseded_by`
//! naming the retained rule.

use std::collections::HashMap;

use log::info;
use serde::Serialize;

use crate::{
    data::CellValue,
    dataset::Dataset,
    planner::{AppliedRule, Candidate},
    profile::WriteMode,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Unchanged,
    Filled,
    Overwritten,
    ConflictSkipped,
}

impl Classification {
    pub fn is_mutating(self) -> bool {
        matches!(self, Classification::Filled | Classification::Overwritten)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Unchanged => "unchanged",
            Classification::Filled => "filled",
            Classification::Overwritten => "overwritten",
            Classification::ConflictSkipped => "conflict_skipped",
        }
    }
}

/// Identity of a target cell: row position plus column name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CellRef {
    pub row: usize,
    pub column: String,
}

impl CellRef {
    pub fn new(row: usize, column: impl Into<String>) -> Self {
        CellRef {
            row,
            column: column.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRecord {
    pub row: usize,
    pub column: String,
    pub source: String,
    pub source_row: usize,
    pub old_value: CellValue,
    /// Value the cell holds after commit; equals `old_value` unless mutating.
    pub new_value: CellValue,
    /// Value the rule offered, after transforms.
    pub proposed: CellValue,
    pub classification: Classification,
    pub rule: AppliedRule,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub superseded_by: Option<usize>,
}

impl ChangeRecord {
    pub fn cell_ref(&self) -> CellRef {
        CellRef::new(self.row, self.column.clone())
    }

    pub fn is_mutating(&self) -> bool {
        self.classification.is_mutating()
    }

    /// Overwrite that leaves the cell as it was.
    pub fn is_noop(&self) -> bool {
        self.old_value.same_value(&self.new_value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffCounts {
    pub unchanged: usize,
    pub filled: usize,
    pub overwritten: usize,
    pub conflict_skipped: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Diff {
    pub records: Vec<ChangeRecord>,
}

impl Diff {
    pub fn mutating(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.records.iter().filter(|r| r.is_mutating())
    }

    pub fn conflicts(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.records
            .iter()
            .filter(|r| r.classification == Classification::ConflictSkipped)
    }

    pub fn counts(&self) -> DiffCounts {
        let mut counts = DiffCounts::default();
        for record in &self.records {
            match record.classification {
                Classification::Unchanged => counts.unchanged += 1,
                Classification::Filled => counts.filled += 1,
                Classification::Overwritten => counts.overwritten += 1,
                Classification::ConflictSkipped => counts.conflict_skipped += 1,
            }
        }
        counts
    }
}

pub fn diff(target: &Dataset, candidates: &[Candidate]) -> Diff {
    let mut records = candidates
        .iter()
        .map(|candidate| {
            let old = target.value(candidate.row, &candidate.column);
            let (classification, new_value) = classify(&old, &candidate.value, &candidate.rule);
            ChangeRecord {
                row: candidate.row,
                column: candidate.column.clone(),
                source: candidate.source.clone(),
                source_row: candidate.source_row,
                old_value: old,
                new_value,
                proposed: candidate.value.clone(),
                classification,
                rule: candidate.rule.clone(),
                superseded_by: None,
            }
        })
        .collect::<Vec<_>>();

    resolve_collisions(&mut records);

    let result = Diff { records };
    let counts = result.counts();
    info!(
        "Diff: {} filled, {} overwritten, {} conflict(s), {} unchanged",
        counts.filled, counts.overwritten, counts.conflict_skipped, counts.unchanged
    );
    result
}

/// Applies one write mode to a cell. Returns the classification and the
/// value the cell would hold afterwards.
pub fn classify(
    old: &CellValue,
    new: &CellValue,
    rule: &AppliedRule,
) -> (Classification, CellValue) {
    let unchanged = || (Classification::Unchanged, old.clone());
    match rule.write_mode {
        WriteMode::Overwrite => (Classification::Overwritten, new.clone()),
        WriteMode::FillIfEmpty => {
            if new.is_empty() {
                unchanged()
            } else if old.is_empty() {
                (Classification::Filled, new.clone())
            } else {
                (Classification::ConflictSkipped, old.clone())
            }
        }
        WriteMode::AppendIfDifferent => {
            if new.is_empty() || old.same_value(new) {
                unchanged()
            } else if old.is_empty() {
                (Classification::Filled, new.clone())
            } else {
                let appended = format!(
                    "{}{}{}",
                    old.as_display(),
                    rule.append_separator,
                    new.as_display()
                );
                (Classification::Overwritten, CellValue::Text(appended))
            }
        }
        WriteMode::SkipIfExists => {
            if old.is_empty() && !new.is_empty() {
                (Classification::Filled, new.clone())
            } else {
                unchanged()
            }
        }
    }
}

fn resolve_collisions(records: &mut [ChangeRecord]) {
    let winners = {
        let mut retained: HashMap<(usize, &str), usize> = HashMap::new();
        for (idx, record) in records.iter().enumerate() {
            if record.is_mutating() {
                retained.insert((record.row, record.column.as_str()), idx);
            }
        }
        records
            .iter()
            .enumerate()
            .filter(|(_, record)| record.is_mutating())
            .filter_map(|(idx, record)| {
                let winner = retained[&(record.row, record.column.as_str())];
                (winner != idx).then(|| (idx, records[winner].rule.index))
            })
            .collect::<Vec<_>>()
    };

    for (idx, winner_rule) in winners {
        let record = &mut records[idx];
        record.classification = Classification::Unchanged;
        record.new_value = record.old_value.clone();
        record.superseded_by = Some(winner_rule);
    }
}
