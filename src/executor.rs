//! Applies approved change records to a target dataset.
//!
//! Only `Filled` and `Overwritten` records are written, and only when their
//! cell is approved. Values are coerced to the declared column type; a value
//! that cannot be stored is reported per record and the remaining records
//! are still applied.

use std::collections::HashSet;

use log::{debug, info, warn};
use serde::Serialize;

use crate::{
    dataset::Dataset,
    diff::{CellRef, ChangeRecord},
    error::MergeError,
};

/// Cells a user accepted for writing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Approval {
    cells: HashSet<CellRef>,
}

impl Approval {
    pub fn none() -> Self {
        Approval::default()
    }

    /// Approves every mutating record.
    pub fn all(records: &[ChangeRecord]) -> Self {
        records
            .iter()
            .filter(|record| record.is_mutating())
            .map(ChangeRecord::cell_ref)
            .collect()
    }

    pub fn insert(&mut self, cell: CellRef) -> bool {
        self.cells.insert(cell)
    }

    pub fn remove(&mut self, cell: &CellRef) -> bool {
        self.cells.remove(cell)
    }

    /// Withdraws approval for every cell of `column`.
    pub fn reject_column(&mut self, column: &str) -> usize {
        let before = self.cells.len();
        self.cells.retain(|cell| cell.column != column);
        before - self.cells.len()
    }

    pub fn contains(&self, cell: &CellRef) -> bool {
        self.cells.contains(cell)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl FromIterator<CellRef> for Approval {
    fn from_iter<I: IntoIterator<Item = CellRef>>(iter: I) -> Self {
        Approval {
            cells: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitError {
    pub row: usize,
    pub column: String,
    pub message: String,
    #[serde(skip)]
    pub error: MergeError,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CommitReport {
    /// Records written to the target, in commit order.
    pub applied: Vec<ChangeRecord>,
    pub skipped: usize,
    pub created_columns: Vec<String>,
    pub errors: Vec<CommitError>,
}

impl CommitReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Writes approved mutating records into `target` in record order.
///
/// The stored value is the record's `new_value`, so committing the same
/// records twice leaves the dataset as after the first commit.
pub fn commit(target: &mut Dataset, records: &[ChangeRecord], approval: &Approval) -> CommitReport {
    let mut report = CommitReport::default();

    for record in records {
        if !record.is_mutating() || !approval.contains(&record.cell_ref()) {
            report.skipped += 1;
            continue;
        }

        let column = match target.column_index(&record.column) {
            Some(idx) => idx,
            None => {
                let idx = target.add_column(&record.column);
                debug!("Created column '{}' in '{}'", record.column, target.name());
                report.created_columns.push(record.column.clone());
                idx
            }
        };

        let column_type = target.column_type(column);
        let value = match column_type.coerce(&record.new_value) {
            Ok(value) => value,
            Err(_) => {
                let error = MergeError::TypeCoercion {
                    row: record.row,
                    column: record.column.clone(),
                    value: record.new_value.as_display(),
                    expected: column_type.to_string(),
                };
                warn!("{error}");
                report.errors.push(CommitError {
                    row: record.row,
                    column: record.column.clone(),
                    message: error.to_string(),
                    error,
                });
                continue;
            }
        };

        match target.set_cell(record.row, column, value) {
            Ok(()) => report.applied.push(record.clone()),
            Err(err) => {
                let error = MergeError::schema(target.name(), &record.column);
                warn!("{err}");
                report.errors.push(CommitError {
                    row: record.row,
                    column: record.column.clone(),
                    message: err.to_string(),
                    error,
                });
            }
        }
    }

    info!(
        "Committed {} change(s) to '{}' ({} skipped, {} error(s))",
        report.applied.len(),
        target.name(),
        report.skipped,
        report.errors.len()
    );
    report
}

/// Like [`commit`], but leaves `target` untouched and returns the merged copy.
pub fn commit_copy(
    target: &Dataset,
    records: &[ChangeRecord],
    approval: &Approval,
) -> (Dataset, CommitReport) {
    let mut merged = target.clone();
    let report = commit(&mut merged, records, approval);
    (merged, report)
}
