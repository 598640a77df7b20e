//! Row batches: restricts a merge to part of the target.
//!
//! Rows outside the batch are still indexed, so duplicate keys are detected
//! across the whole file, but they receive no candidate writes and are left
//! out of summaries and unmatched logs.

use std::{collections::BTreeSet, fmt};

use itertools::Itertools;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::{
    data::CellValue,
    dataset::Dataset,
    error::{MergeError, MergeResult},
    key::{Key, KeyOptions, normalize},
};

/// Which target rows a merge processes. Row numbers are 1-based data rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BatchFilter {
    #[default]
    All,
    /// Rows `first..=last`; without `last` the range runs to the end.
    Range {
        first: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        last: Option<usize>,
    },
    /// Rows whose normalized key is listed. Composite keys are written `a | b`.
    Keys { keys: Vec<String> },
    /// The first `limit` rows.
    Limit { limit: usize },
    /// Rows whose key text matches a regular expression, ignoring case.
    Pattern { pattern: String },
}

impl BatchFilter {
    pub fn is_all(&self) -> bool {
        matches!(self, BatchFilter::All)
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            BatchFilter::All | BatchFilter::Limit { .. } => Ok(()),
            BatchFilter::Range { first, last } => {
                if *first == 0 {
                    return Err("range rows start at 1".to_string());
                }
                match last {
                    Some(last) if last < first => {
                        Err(format!("range {first}-{last} ends before it starts"))
                    }
                    _ => Ok(()),
                }
            }
            BatchFilter::Keys { keys } => {
                if keys.iter().all(|key| key.trim().is_empty()) {
                    Err("key list is empty".to_string())
                } else {
                    Ok(())
                }
            }
            BatchFilter::Pattern { pattern } => compile(pattern).map(|_| ()),
        }
    }

    /// Evaluates the filter against every row of `target`.
    pub fn select(
        &self,
        target: &Dataset,
        key_columns: &[String],
        options: &KeyOptions,
    ) -> MergeResult<RowSelection> {
        let row_count = target.row_count();
        let rows: Vec<bool> = match self {
            BatchFilter::All => return Ok(RowSelection::all(row_count)),
            BatchFilter::Range { first, last } => (1..=row_count)
                .map(|number| number >= *first && last.is_none_or(|last| number <= last))
                .collect(),
            BatchFilter::Limit { limit } => (0..row_count).map(|row| row < *limit).collect(),
            BatchFilter::Keys { keys } => {
                let wanted = keys
                    .iter()
                    .map(|entry| parse_key(entry, options))
                    .filter(|key| !key.is_empty())
                    .collect::<BTreeSet<_>>();
                let positions = key_positions(target, key_columns)?;
                (0..row_count)
                    .map(|row| wanted.contains(&normalize(&key_cells(target, &positions, row), options)))
                    .collect()
            }
            BatchFilter::Pattern { pattern } => {
                let regex = compile(pattern)
                    .map_err(|message| MergeError::profile_format("batch filter", message))?;
                let positions = key_positions(target, key_columns)?;
                (0..row_count)
                    .map(|row| {
                        let text = key_cells(target, &positions, row)
                            .iter()
                            .map(CellValue::as_display)
                            .join(" | ");
                        regex.is_match(&text)
                    })
                    .collect()
            }
        };
        Ok(RowSelection { rows })
    }
}

impl fmt::Display for BatchFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchFilter::All => f.write_str("all rows"),
            BatchFilter::Range { first, last: Some(last) } => write!(f, "rows {first}-{last}"),
            BatchFilter::Range { first, last: None } => write!(f, "rows {first}-end"),
            BatchFilter::Keys { keys } => write!(f, "{} listed key(s)", keys.len()),
            BatchFilter::Limit { limit } => write!(f, "first {limit} row(s)"),
            BatchFilter::Pattern { pattern } => write!(f, "keys matching '{pattern}'"),
        }
    }
}

fn compile(pattern: &str) -> Result<Regex, String> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|err| format!("invalid key pattern: {err}"))
}

fn parse_key(entry: &str, options: &KeyOptions) -> Key {
    let cells = entry.split('|').map(CellValue::from_raw).collect::<Vec<_>>();
    normalize(&cells, options)
}

fn key_positions(target: &Dataset, key_columns: &[String]) -> MergeResult<Vec<usize>> {
    key_columns
        .iter()
        .map(|column| target.require_column(column))
        .collect()
}

fn key_cells(target: &Dataset, positions: &[usize], row: usize) -> Vec<CellValue> {
    positions
        .iter()
        .map(|idx| target.cell(row, *idx).cloned().unwrap_or_default())
        .collect()
}

/// Target rows taking part in one merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowSelection {
    rows: Vec<bool>,
}

impl RowSelection {
    pub fn all(row_count: usize) -> Self {
        RowSelection {
            rows: vec![true; row_count],
        }
    }

    pub fn contains(&self, row: usize) -> bool {
        self.rows.get(row).copied().unwrap_or(false)
    }

    pub fn count(&self) -> usize {
        self.rows.iter().filter(|selected| **selected).count()
    }

    pub fn is_all(&self) -> bool {
        self.rows.iter().all(|selected| *selected)
    }

    pub fn rows(&self) -> impl Iterator<Item = usize> + '_ {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, selected)| **selected)
            .map(|(row, _)| row)
    }
}
